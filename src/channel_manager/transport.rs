//! Streaming transport over HTTP

use crate::error::{Error, Result};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;

/// Stream of raw JSON frames, one per line
pub type FrameStream = BoxStream<'static, Result<String>>;

/// A connectable source of newline-delimited frames.
///
/// Implementations open one connection per call; the channel manager owns
/// the reconnect loop around it.
pub trait ChannelTransport: Send + Sync {
    fn connect(&self) -> BoxFuture<'_, Result<FrameStream>>;
}

/// Long-lived HTTP GET whose body is a newline-delimited JSON stream
pub struct HttpStreamTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpStreamTransport {
    /// Connect timeout only; the response body is expected to stay open
    /// indefinitely.
    pub fn new(url: &str) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            url: url.to_string(),
        }
    }
}

impl ChannelTransport for HttpStreamTransport {
    fn connect(&self) -> BoxFuture<'_, Result<FrameStream>> {
        Box::pin(async move {
            let response = self.client.get(&self.url).send().await?;
            if !response.status().is_success() {
                return Err(Error::Channel(format!(
                    "stream endpoint {} returned {}",
                    self.url,
                    response.status()
                )));
            }
            Ok(line_stream(response.bytes_stream()))
        })
    }
}

struct LineState<B, E> {
    source: BoxStream<'static, std::result::Result<B, E>>,
    buffer: Vec<u8>,
    pending: VecDeque<Result<String>>,
    done: bool,
}

/// Split a byte stream into trimmed, non-empty lines.
///
/// A source error is surfaced as one `Err` frame and ends the stream; an
/// unterminated final line is flushed when the source closes.
pub(crate) fn line_stream<S, B, E>(source: S) -> FrameStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    let state = LineState {
        source: source.boxed(),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.pending.pop_front() {
                return Some((frame, state));
            }
            if state.done {
                return None;
            }
            match state.source.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(chunk.as_ref());
                    while let Some(pos) = state.buffer.iter().position(|&b| b == b'\n') {
                        let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                        push_line(&mut state.pending, &line[..line.len() - 1]);
                    }
                }
                Some(Err(e)) => {
                    state.done = true;
                    state.pending.push_back(Err(e.into()));
                }
                None => {
                    state.done = true;
                    if !state.buffer.is_empty() {
                        let rest = std::mem::take(&mut state.buffer);
                        push_line(&mut state.pending, &rest);
                    }
                }
            }
        }
    })
    .boxed()
}

fn push_line(pending: &mut VecDeque<Result<String>>, raw: &[u8]) {
    match std::str::from_utf8(raw) {
        Ok(text) => {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                pending.push_back(Ok(trimmed.to_string()));
            }
        }
        Err(e) => {
            pending.push_back(Err(Error::Parse(format!("invalid UTF-8 in frame: {}", e))));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    async fn collect_lines(chunks: Vec<&'static [u8]>) -> Vec<Result<String>> {
        let source = stream::iter(chunks.into_iter().map(Ok::<_, Error>));
        line_stream(source).collect().await
    }

    #[tokio::test]
    async fn test_lines_split_across_chunk_boundaries() {
        let lines = collect_lines(vec![b"{\"a\":", b"1}\n{\"b\"", b":2}\n"]).await;
        let frames: Vec<String> = lines.into_iter().map(|l| l.unwrap()).collect();
        assert_eq!(frames, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[tokio::test]
    async fn test_blank_lines_skipped_and_tail_flushed() {
        let lines = collect_lines(vec![b"\n\n{\"a\":1}\n\n", b"{\"tail\":true}"]).await;
        let frames: Vec<String> = lines.into_iter().map(|l| l.unwrap()).collect();
        assert_eq!(frames, vec!["{\"a\":1}", "{\"tail\":true}"]);
    }

    #[tokio::test]
    async fn test_source_error_ends_stream_after_err_frame() {
        let source = stream::iter(vec![
            Ok::<&[u8], Error>(b"{\"a\":1}\n"),
            Err(Error::Channel("connection reset".to_string())),
            Ok(b"{\"never\":true}\n"),
        ]);
        let lines: Vec<Result<String>> = line_stream(source).collect().await;

        assert_eq!(lines.len(), 2);
        assert!(lines[0].is_ok());
        assert!(lines[1].is_err());
    }

    #[tokio::test]
    async fn test_invalid_utf8_yields_parse_error_frame() {
        let lines = collect_lines(vec![b"\xff\xfe\n{\"a\":1}\n"]).await;
        assert!(matches!(lines[0], Err(Error::Parse(_))));
        assert_eq!(lines[1].as_ref().unwrap(), "{\"a\":1}");
    }
}

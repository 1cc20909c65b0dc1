//! Error handling for the tracking console core

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed wire payload (dropped, never fatal to a channel)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Channel transport failure (open refused, stream broken)
    #[error("Channel error: {0}")]
    Channel(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

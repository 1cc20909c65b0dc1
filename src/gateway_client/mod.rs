//! Gateway Client - REST Access to the API Gateway
//!
//! ## Responsibilities
//! - Fetch the camera inventory used to mount feeds at startup
//! - Fetch recent log history to seed the event log
//! - Poll the authoritative alert count
//! - Health probe for the status digest

use crate::channel_manager::WireLogEntry;
use crate::error::{Error, Result};
use crate::event_log::LogEntry;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Camera as the gateway advertises it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraInfo {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlertCount {
    count: u64,
}

pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the camera list, retrying transient failures with exponential
    /// backoff
    pub async fn fetch_cameras(&self, max_retries: u32) -> Result<Vec<CameraInfo>> {
        let mut attempt: u32 = 0;
        loop {
            match self.try_fetch_cameras().await {
                Ok(cameras) => {
                    tracing::debug!(count = cameras.len(), "Camera inventory fetched");
                    return Ok(cameras);
                }
                Err(e) if attempt < max_retries => {
                    let delay = Duration::from_millis(100 * 2u64.pow(attempt));
                    tracing::warn!(
                        error = %e,
                        attempt = attempt + 1,
                        "Camera fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_fetch_cameras(&self) -> Result<Vec<CameraInfo>> {
        let url = format!("{}/cameras", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "camera list request returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    /// Recent log history, most recent first
    pub async fn fetch_recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let url = format!("{}/logs", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "log history request returned {}",
                response.status()
            )));
        }
        let raw: Vec<WireLogEntry> = response.json().await?;
        Ok(raw.into_iter().map(WireLogEntry::into_entry).collect())
    }

    pub async fn fetch_alert_count(&self) -> Result<u64> {
        let url = format!("{}/alerts/count", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "alert count request returned {}",
                response.status()
            )));
        }
        let body: AlertCount = response.json().await?;
        Ok(body.count)
    }

    /// True when the gateway answers its health endpoint
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Gateway health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_info_tolerates_extra_and_missing_fields() {
        let raw = r#"[
            {"id": "cam_001", "name": "Entrance Camera", "location": "Main Entrance", "status": "active"},
            {"id": "cam_002", "name": "Checkout Camera", "stream_endpoint": "http://localhost:8002/stream"}
        ]"#;

        let cameras: Vec<CameraInfo> = serde_json::from_str(raw).unwrap();
        assert_eq!(cameras.len(), 2);
        assert_eq!(cameras[0].id, "cam_001");
        assert!(cameras[0].stream_endpoint.is_none());
        assert_eq!(
            cameras[1].stream_endpoint.as_deref(),
            Some("http://localhost:8002/stream")
        );
    }

    #[test]
    fn test_alert_count_shape() {
        let body: AlertCount = serde_json::from_str(r#"{"count": 2}"#).unwrap();
        assert_eq!(body.count, 2);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = GatewayClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}

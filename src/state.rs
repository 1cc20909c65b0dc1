//! Application state
//!
//! Holds all shared components and state

use crate::channel_manager::{ChannelManager, ChannelStatus};
use crate::event_log::{EventLog, LogEntry};
use crate::feed_coordinator::{FeedCoordinator, FeedView};
use crate::gateway_client::GatewayClient;
use crate::identity_registry::IdentityRegistry;
use crate::overlay_projector::OverlayBox;
use crate::track_store::TrackStore;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// API gateway base URL
    pub gateway_url: String,
    /// Tracking stream URL
    pub tracking_stream_url: String,
    /// Dashboard stream URL
    pub dashboard_stream_url: String,
    /// Log history entries fetched at startup
    pub log_fetch_limit: usize,
    /// Alert count poll interval in seconds
    pub alert_poll_secs: u64,
    /// Status digest interval in seconds
    pub digest_secs: u64,
    /// Run against simulated channels instead of the gateway
    pub simulate: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway_url: std::env::var("GATEWAY_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            tracking_stream_url: std::env::var("TRACKING_STREAM_URL")
                .unwrap_or_else(|_| "http://localhost:8001/stream/tracking".to_string()),
            dashboard_stream_url: std::env::var("DASHBOARD_STREAM_URL")
                .unwrap_or_else(|_| "http://localhost:8000/stream/dashboard".to_string()),
            log_fetch_limit: std::env::var("LOG_FETCH_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
            alert_poll_secs: std::env::var("ALERT_POLL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            digest_secs: std::env::var("DIGEST_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            simulate: std::env::var("SIMULATE")
                .map(|v| v == "true")
                .unwrap_or(false),
        }
    }
}

/// Application state shared across tasks
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// IdentityRegistry (session to person resolution)
    pub registry: Arc<IdentityRegistry>,
    /// TrackStore (per-camera tracked objects)
    pub store: Arc<TrackStore>,
    /// EventLog (bounded activity feed)
    pub event_log: Arc<EventLog>,
    /// GatewayClient (REST access to the gateway)
    pub gateway: Arc<GatewayClient>,
    /// FeedCoordinator (camera tiles and playback)
    pub feeds: Arc<FeedCoordinator>,
    /// Tracking channel manager
    pub tracking_channel: Arc<ChannelManager>,
    /// Dashboard channel manager
    pub dashboard_channel: Arc<ChannelManager>,
}

impl AppState {
    /// (tracking, dashboard) channel statuses
    pub async fn channel_statuses(&self) -> (ChannelStatus, ChannelStatus) {
        (
            self.tracking_channel.status().await,
            self.dashboard_channel.status().await,
        )
    }

    pub async fn alert_count(&self) -> u64 {
        self.event_log.alert_count().await
    }

    pub async fn log_entries(&self) -> Vec<LogEntry> {
        self.event_log.entries().await
    }

    /// Current overlay boxes for one camera
    pub async fn overlays(&self, camera_id: &str) -> Vec<OverlayBox> {
        let objects = self.store.objects(camera_id).await;
        crate::overlay_projector::project(&objects)
    }

    pub async fn feed_views(&self) -> Vec<FeedView> {
        self.feeds.render_all().await
    }

    /// Stop both channels and unmount every feed. Safe to call more than
    /// once.
    pub async fn shutdown(&self) {
        self.tracking_channel.stop().await;
        self.dashboard_channel.stop().await;
        self.feeds.unmount_all().await;
        tracing::info!("Console torn down");
    }
}

//! Feed presentation types

use crate::gateway_client::CameraInfo;
use crate::overlay_projector::OverlayBox;
use serde::Serialize;

/// Playback volume a freshly mounted feed starts at
pub const DEFAULT_VOLUME: u8 = 50;

#[derive(Debug, Clone, Serialize)]
pub struct Camera {
    pub id: String,
    pub name: String,
    pub stream_endpoint: Option<String>,
}

impl From<CameraInfo> for Camera {
    fn from(info: CameraInfo) -> Self {
        Self {
            id: info.id,
            name: info.name,
            stream_endpoint: info.stream_endpoint,
        }
    }
}

/// Where a feed tile draws its video from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VideoSurface {
    Attached { endpoint: String },
    Unavailable { reason: String },
}

/// One camera tile, ready to draw
#[derive(Debug, Clone, Serialize)]
pub struct FeedView {
    pub camera_id: String,
    pub camera_name: String,
    pub surface: VideoSurface,
    pub playing: bool,
    pub volume: u8,
    pub boxes: Vec<OverlayBox>,
}

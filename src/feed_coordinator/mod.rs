//! Feed Coordinator - Camera Tiles and Playback State
//!
//! ## Responsibilities
//! - Mount one feed per camera from the gateway inventory
//! - Hold per-feed playback state (playing, volume, video surface)
//! - Render feed views with the current tracking overlays projected in
//! - Unmount everything on teardown, dropping the per-camera track state

mod types;

pub use types::*;

use crate::overlay_projector;
use crate::track_store::TrackStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

struct FeedState {
    camera: Camera,
    surface: VideoSurface,
    playing: bool,
    volume: u8,
}

pub struct FeedCoordinator {
    feeds: RwLock<HashMap<String, FeedState>>,
    store: Arc<TrackStore>,
}

impl FeedCoordinator {
    pub fn new(store: Arc<TrackStore>) -> Self {
        Self {
            feeds: RwLock::new(HashMap::new()),
            store,
        }
    }

    /// Mount a feed per camera and register each with the track store.
    /// Cameras without a stream endpoint still mount; their tile shows a
    /// placeholder surface while overlays keep working.
    pub async fn mount_cameras(&self, cameras: Vec<Camera>) {
        let mut feeds = self.feeds.write().await;
        for camera in cameras {
            self.store.register_camera(&camera.id).await;
            let surface = match camera.stream_endpoint.as_deref() {
                Some(endpoint) if !endpoint.is_empty() => VideoSurface::Attached {
                    endpoint: endpoint.to_string(),
                },
                _ => VideoSurface::Unavailable {
                    reason: "no stream endpoint".to_string(),
                },
            };
            tracing::info!(camera_id = %camera.id, name = %camera.name, "Feed mounted");
            feeds.insert(
                camera.id.clone(),
                FeedState {
                    camera,
                    surface,
                    playing: true,
                    volume: DEFAULT_VOLUME,
                },
            );
        }
    }

    /// Returns false when the camera has no mounted feed
    pub async fn set_playing(&self, camera_id: &str, playing: bool) -> bool {
        let mut feeds = self.feeds.write().await;
        match feeds.get_mut(camera_id) {
            Some(feed) => {
                feed.playing = playing;
                true
            }
            None => false,
        }
    }

    /// Volume is clamped to 0..=100
    pub async fn set_volume(&self, camera_id: &str, volume: u8) -> bool {
        let mut feeds = self.feeds.write().await;
        match feeds.get_mut(camera_id) {
            Some(feed) => {
                feed.volume = volume.min(100);
                true
            }
            None => false,
        }
    }

    /// One feed view with current overlays, or None for an unmounted camera
    pub async fn render(&self, camera_id: &str) -> Option<FeedView> {
        let objects = self.store.objects(camera_id).await;
        let feeds = self.feeds.read().await;
        let feed = feeds.get(camera_id)?;
        Some(FeedView {
            camera_id: feed.camera.id.clone(),
            camera_name: feed.camera.name.clone(),
            surface: feed.surface.clone(),
            playing: feed.playing,
            volume: feed.volume,
            boxes: overlay_projector::project(&objects),
        })
    }

    /// All feed views, ordered by camera id
    pub async fn render_all(&self) -> Vec<FeedView> {
        let ids: Vec<String> = {
            let feeds = self.feeds.read().await;
            let mut ids: Vec<String> = feeds.keys().cloned().collect();
            ids.sort();
            ids
        };
        let mut views = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(view) = self.render(&id).await {
                views.push(view);
            }
        }
        views
    }

    pub async fn camera_count(&self) -> usize {
        let feeds = self.feeds.read().await;
        feeds.len()
    }

    pub async fn unmount_all(&self) {
        let mut feeds = self.feeds.write().await;
        for camera_id in feeds.keys() {
            self.store.remove_camera(camera_id).await;
        }
        feeds.clear();
        tracing::info!("All feeds unmounted");
    }
}

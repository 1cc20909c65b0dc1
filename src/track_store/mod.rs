//! Track Store - Per-Camera Tracked Object State
//!
//! ## Responsibilities
//! - Hold the live set of tracked objects for every mounted camera
//! - Apply authoritative snapshots, motion deltas and removals from the
//!   tracking channel
//! - Drive identification through the identity registry and keep the
//!   transition one-way (identified objects never fall back to anonymous)
//! - Emit departure and identification entries into the event log

mod types;

pub use types::*;

use crate::event_log::{EventLog, LogEntry};
use crate::identity_registry::{IdentityCandidate, IdentityRegistry, Resolution};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct TrackStore {
    cameras: RwLock<HashMap<String, Vec<TrackedObject>>>,
    registry: Arc<IdentityRegistry>,
    event_log: Arc<EventLog>,
}

impl TrackStore {
    pub fn new(registry: Arc<IdentityRegistry>, event_log: Arc<EventLog>) -> Self {
        Self {
            cameras: RwLock::new(HashMap::new()),
            registry,
            event_log,
        }
    }

    /// Start tracking state for a camera. Idempotent; an existing object
    /// list is kept as-is.
    pub async fn register_camera(&self, camera_id: &str) {
        let mut cameras = self.cameras.write().await;
        cameras.entry(camera_id.to_string()).or_default();
    }

    /// Drop all state for a camera
    pub async fn remove_camera(&self, camera_id: &str) {
        let mut cameras = self.cameras.write().await;
        cameras.remove(camera_id);
    }

    /// Replace a camera's object list with an authoritative snapshot.
    ///
    /// Sessions that survive the replace keep their identification. Snapshots
    /// that carry identity fields trigger resolution through the registry
    /// after the list is swapped in.
    pub async fn apply_full_replace(&self, camera_id: &str, snapshots: Vec<ObjectSnapshot>) {
        let mut pending_identify = Vec::new();

        {
            let mut cameras = self.cameras.write().await;
            let Some(objects) = cameras.get_mut(camera_id) else {
                tracing::debug!(camera_id = %camera_id, "Snapshot for unknown camera dropped");
                return;
            };

            let mut previous: HashMap<String, TrackedObject> =
                objects.drain(..).map(|o| (o.session_id().to_string(), o)).collect();

            for snap in snapshots {
                let bbox = snap.bbox.clamped();
                match previous.remove(&snap.session_id) {
                    Some(TrackedObject::Identified {
                        session_id,
                        person_id,
                        display_name,
                        confidence,
                        is_loyal_member,
                        ..
                    }) => {
                        objects.push(TrackedObject::Identified {
                            session_id,
                            bbox,
                            person_id,
                            display_name,
                            confidence: snap.confidence.or(confidence),
                            is_loyal_member,
                        });
                    }
                    _ => {
                        if let Some(identity) = snap.identity {
                            pending_identify.push((snap.session_id.clone(), identity));
                        }
                        objects.push(TrackedObject::Tracking {
                            session_id: snap.session_id,
                            bbox,
                            confidence: snap.confidence,
                        });
                    }
                }
            }
        }

        for (session_id, identity) in pending_identify {
            self.identify(camera_id, &session_id, identity).await;
        }
    }

    /// Nudge objects by per-session deltas. Unknown sessions are skipped.
    pub async fn apply_motion(&self, camera_id: &str, moves: Vec<MotionDelta>) {
        let mut cameras = self.cameras.write().await;
        let Some(objects) = cameras.get_mut(camera_id) else {
            tracing::debug!(camera_id = %camera_id, "Motion for unknown camera dropped");
            return;
        };

        for delta in moves {
            if let Some(obj) = objects.iter_mut().find(|o| o.session_id() == delta.session_id) {
                *obj.bbox_mut() = obj.bbox().nudged(delta.dx, delta.dy);
            }
        }
    }

    /// Remove one session and log its departure
    pub async fn remove_object(&self, camera_id: &str, session_id: &str) {
        let removed = {
            let mut cameras = self.cameras.write().await;
            let Some(objects) = cameras.get_mut(camera_id) else {
                tracing::debug!(camera_id = %camera_id, "Removal for unknown camera dropped");
                return;
            };

            match objects.iter().position(|o| o.session_id() == session_id) {
                Some(index) => objects.remove(index),
                None => {
                    tracing::debug!(
                        camera_id = %camera_id,
                        session_id = %session_id,
                        "Removal for unknown session dropped"
                    );
                    return;
                }
            }
        };

        let message = match &removed {
            TrackedObject::Identified { display_name, .. } => {
                format!("{} left the view.", display_name)
            }
            TrackedObject::Tracking { .. } => "Human left the view.".to_string(),
        };
        self.event_log.append(LogEntry::now(camera_id, message)).await;
    }

    /// Resolve an identification for a tracked session.
    ///
    /// No-op when the session is missing or already identified; the first
    /// resolution wins and later candidates for the same session are ignored.
    pub async fn identify(&self, camera_id: &str, session_id: &str, candidate: IdentityCandidate) {
        {
            let cameras = self.cameras.read().await;
            let Some(objects) = cameras.get(camera_id) else {
                return;
            };
            match objects.iter().find(|o| o.session_id() == session_id) {
                Some(obj) if !obj.is_identified() => {}
                _ => return,
            }
        }

        let resolution = self.registry.resolve(&candidate).await;

        {
            let mut cameras = self.cameras.write().await;
            let Some(objects) = cameras.get_mut(camera_id) else {
                return;
            };
            let Some(obj) = objects
                .iter_mut()
                .find(|o| o.session_id() == session_id && !o.is_identified())
            else {
                return;
            };

            let bbox = obj.bbox();
            let confidence = candidate.confidence.or(obj.confidence());
            let person = resolution.person();
            *obj = TrackedObject::Identified {
                session_id: session_id.to_string(),
                bbox,
                person_id: person.person_id.clone(),
                display_name: person.display_name.clone(),
                confidence,
                is_loyal_member: person.is_loyal_member,
            };
        }

        let message = match &resolution {
            Resolution::Returning(person) => {
                tracing::info!(
                    camera_id = %camera_id,
                    person_id = %person.person_id,
                    "Returning person recognized"
                );
                format!("Recognized returning customer: {}", person.display_name)
            }
            Resolution::New(person) => {
                tracing::info!(
                    camera_id = %camera_id,
                    person_id = %person.person_id,
                    "New person identified"
                );
                format!("New user identified: {}", person.display_name)
            }
        };
        self.event_log.append(LogEntry::now(camera_id, message)).await;
    }

    /// Current objects for one camera
    pub async fn objects(&self, camera_id: &str) -> Vec<TrackedObject> {
        let cameras = self.cameras.read().await;
        cameras.get(camera_id).cloned().unwrap_or_default()
    }

    /// Total object count across all cameras
    pub async fn object_count(&self) -> usize {
        let cameras = self.cameras.read().await;
        cameras.values().map(|v| v.len()).sum()
    }

    pub async fn camera_ids(&self) -> Vec<String> {
        let cameras = self.cameras.read().await;
        let mut ids: Vec<String> = cameras.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop every camera and object
    pub async fn reset(&self) {
        let mut cameras = self.cameras.write().await;
        cameras.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TrackStore {
        let registry = Arc::new(IdentityRegistry::new());
        let event_log = Arc::new(EventLog::default());
        TrackStore::new(registry, event_log)
    }

    fn snapshot(session_id: &str, x: f64, y: f64) -> ObjectSnapshot {
        ObjectSnapshot {
            session_id: session_id.to_string(),
            bbox: BoundingBox::new(x, y, 10.0, 20.0),
            ..Default::default()
        }
    }

    fn named_candidate(person_id: &str, name: &str) -> IdentityCandidate {
        IdentityCandidate {
            person_id: Some(person_id.to_string()),
            display_name: Some(name.to_string()),
            confidence: Some(90.0),
            is_loyal_member: Some(true),
        }
    }

    #[tokio::test]
    async fn test_full_replace_is_idempotent() {
        let store = store();
        store.register_camera("cam_001").await;

        let snaps = vec![snapshot("s-1", 10.0, 10.0), snapshot("s-2", 40.0, 40.0)];
        store.apply_full_replace("cam_001", snaps.clone()).await;
        let first = store.objects("cam_001").await;

        store.apply_full_replace("cam_001", snaps).await;
        let second = store.objects("cam_001").await;

        assert_eq!(first, second);
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn test_full_replace_preserves_identity_of_surviving_sessions() {
        let store = store();
        store.register_camera("cam_001").await;
        store.apply_full_replace("cam_001", vec![snapshot("s-1", 10.0, 10.0)]).await;
        store.identify("cam_001", "s-1", named_candidate("p-1", "Alice")).await;

        // Snapshot without identity fields must not strip the identification
        store.apply_full_replace("cam_001", vec![snapshot("s-1", 55.0, 5.0)]).await;

        let objects = store.objects("cam_001").await;
        assert_eq!(objects.len(), 1);
        match &objects[0] {
            TrackedObject::Identified { person_id, display_name, bbox, .. } => {
                assert_eq!(person_id, "p-1");
                assert_eq!(display_name, "Alice");
                assert_eq!(bbox.x, 55.0);
            }
            other => panic!("expected identified object, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_full_replace_drops_missing_sessions() {
        let store = store();
        store.register_camera("cam_001").await;
        store
            .apply_full_replace("cam_001", vec![snapshot("s-1", 10.0, 10.0), snapshot("s-2", 40.0, 40.0)])
            .await;

        store.apply_full_replace("cam_001", vec![snapshot("s-2", 42.0, 40.0)]).await;

        let objects = store.objects("cam_001").await;
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].session_id(), "s-2");
    }

    #[tokio::test]
    async fn test_motion_clamps_at_frame_edges() {
        let store = store();
        store.register_camera("cam_001").await;
        store.apply_full_replace("cam_001", vec![snapshot("s-1", 85.0, 5.0)]).await;

        let moves = vec![MotionDelta { session_id: "s-1".to_string(), dx: 50.0, dy: -50.0 }];
        store.apply_motion("cam_001", moves).await;

        let objects = store.objects("cam_001").await;
        let bbox = objects[0].bbox();
        assert_eq!(bbox.x, 90.0);
        assert_eq!(bbox.y, 0.0);
    }

    #[tokio::test]
    async fn test_unknown_camera_and_session_are_no_ops() {
        let store = store();
        store.register_camera("cam_001").await;
        store.apply_full_replace("cam_001", vec![snapshot("s-1", 10.0, 10.0)]).await;

        store.apply_full_replace("cam_404", vec![snapshot("s-9", 0.0, 0.0)]).await;
        store
            .apply_motion("cam_404", vec![MotionDelta { session_id: "s-1".to_string(), dx: 1.0, dy: 1.0 }])
            .await;
        store.remove_object("cam_404", "s-1").await;
        store.remove_object("cam_001", "s-404").await;

        let objects = store.objects("cam_001").await;
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].bbox().x, 10.0);
    }

    #[tokio::test]
    async fn test_identification_is_one_way() {
        let store = store();
        store.register_camera("cam_001").await;
        store.apply_full_replace("cam_001", vec![snapshot("s-1", 10.0, 10.0)]).await;
        store.identify("cam_001", "s-1", named_candidate("p-1", "Alice")).await;

        // A second candidate for the same session must be ignored
        store.identify("cam_001", "s-1", named_candidate("p-2", "Bob")).await;

        let objects = store.objects("cam_001").await;
        match &objects[0] {
            TrackedObject::Identified { person_id, display_name, .. } => {
                assert_eq!(person_id, "p-1");
                assert_eq!(display_name, "Alice");
            }
            other => panic!("expected identified object, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_leave_and_return_shares_person_id() {
        let registry = Arc::new(IdentityRegistry::new());
        let event_log = Arc::new(EventLog::default());
        let store = TrackStore::new(registry.clone(), event_log);
        store.register_camera("cam_001").await;

        store.apply_full_replace("cam_001", vec![snapshot("s-1", 10.0, 10.0)]).await;
        store.identify("cam_001", "s-1", named_candidate("p-7", "Carol")).await;
        store.remove_object("cam_001", "s-1").await;

        // New appearance, new session, same wire identity
        store.apply_full_replace("cam_001", vec![snapshot("s-2", 30.0, 30.0)]).await;
        store.identify("cam_001", "s-2", named_candidate("p-7", "Carol")).await;

        let objects = store.objects("cam_001").await;
        match &objects[0] {
            TrackedObject::Identified { session_id, person_id, .. } => {
                assert_eq!(session_id, "s-2");
                assert_eq!(person_id, "p-7");
            }
            other => panic!("expected identified object, got {:?}", other),
        }
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_departure_messages() {
        let registry = Arc::new(IdentityRegistry::new());
        let event_log = Arc::new(EventLog::default());
        let store = TrackStore::new(registry, event_log.clone());
        store.register_camera("cam_001").await;

        store
            .apply_full_replace("cam_001", vec![snapshot("s-1", 10.0, 10.0), snapshot("s-2", 40.0, 40.0)])
            .await;
        store.identify("cam_001", "s-1", named_candidate("p-1", "Alice")).await;

        store.remove_object("cam_001", "s-1").await;
        store.remove_object("cam_001", "s-2").await;

        let entries = event_log.entries().await;
        let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
        assert!(messages.contains(&"Alice left the view."));
        assert!(messages.contains(&"Human left the view."));
        assert!(store.objects("cam_001").await.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_identity_fields_trigger_identification() {
        let store = store();
        store.register_camera("cam_001").await;

        let snap = ObjectSnapshot {
            session_id: "s-1".to_string(),
            bbox: BoundingBox::new(10.0, 10.0, 10.0, 20.0),
            confidence: Some(0.8),
            identity: Some(named_candidate("p-3", "Dave")),
        };
        store.apply_full_replace("cam_001", vec![snap]).await;

        let objects = store.objects("cam_001").await;
        match &objects[0] {
            TrackedObject::Identified { person_id, is_loyal_member, .. } => {
                assert_eq!(person_id, "p-3");
                assert!(is_loyal_member);
            }
            other => panic!("expected identified object, got {:?}", other),
        }
    }
}

//! Simulated channel sources for offline development
//!
//! Generates tracking and dashboard frames locally so the console can run
//! without a gateway. The tracking script keeps its sessions across
//! reconnects, so an injected drop exercises the same resume path a real
//! stream would.

use super::transport::{ChannelTransport, FrameStream};
use super::types::{DashboardFrame, TrackingFrame, WireLogEntry, WireMove, WireObject};
use crate::error::{Error, Result};
use crate::identity_registry::{IdentityRegistry, KnownPerson};
use crate::track_store::BoundingBox;
use chrono::Utc;
use futures::future::BoxFuture;
use futures::StreamExt;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Decides whether a connection drop is injected after a frame
pub trait FaultPolicy: Send + Sync {
    fn should_drop(&self, frames_emitted: u64) -> bool;
}

pub struct NoFaults;

impl FaultPolicy for NoFaults {
    fn should_drop(&self, _frames_emitted: u64) -> bool {
        false
    }
}

/// Drop the connection every `every` frames
pub struct PeriodicDrop {
    pub every: u64,
}

impl FaultPolicy for PeriodicDrop {
    fn should_drop(&self, frames_emitted: u64) -> bool {
        frames_emitted > 0 && frames_emitted % self.every == 0
    }
}

#[derive(Clone)]
struct SimSession {
    session_id: String,
    bbox: BoundingBox,
    person_id: Option<String>,
    name: Option<String>,
    loyalty: bool,
    confidence: Option<f64>,
}

#[derive(Default)]
struct SimScript {
    sessions: HashMap<String, Vec<SimSession>>,
}

/// Random walk over appearance, motion, recognition and departure events
pub struct SimulatedTracking {
    registry: Arc<IdentityRegistry>,
    cameras: Arc<Vec<String>>,
    fault: Arc<dyn FaultPolicy>,
    interval: Duration,
    script: Arc<RwLock<SimScript>>,
}

impl SimulatedTracking {
    pub fn new(
        registry: Arc<IdentityRegistry>,
        cameras: Vec<String>,
        fault: Arc<dyn FaultPolicy>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            cameras: Arc::new(cameras),
            fault,
            interval,
            script: Arc::new(RwLock::new(SimScript::default())),
        }
    }
}

struct TrackingState {
    registry: Arc<IdentityRegistry>,
    cameras: Arc<Vec<String>>,
    fault: Arc<dyn FaultPolicy>,
    interval: Duration,
    script: Arc<RwLock<SimScript>>,
    emitted: u64,
    dropped: bool,
}

impl ChannelTransport for SimulatedTracking {
    fn connect(&self) -> BoxFuture<'_, Result<FrameStream>> {
        let state = TrackingState {
            registry: self.registry.clone(),
            cameras: self.cameras.clone(),
            fault: self.fault.clone(),
            interval: self.interval,
            script: self.script.clone(),
            emitted: 0,
            dropped: false,
        };

        Box::pin(async move {
            tracing::debug!("Simulated tracking channel opened");
            Ok(futures::stream::unfold(state, |mut state| async move {
                if state.dropped {
                    return None;
                }
                tokio::time::sleep(state.interval).await;
                state.emitted += 1;
                if state.fault.should_drop(state.emitted) {
                    state.dropped = true;
                    return Some((
                        Err(Error::Channel("injected connection drop".to_string())),
                        state,
                    ));
                }

                let known = state.registry.pick_random_known().await;
                let frame = {
                    let mut script = state.script.write().await;
                    next_tracking_frame(&mut script, &state.cameras, known)
                };
                let line = serde_json::to_string(&frame).map_err(Error::from);
                Some((line, state))
            })
            .boxed())
        })
    }
}

fn next_tracking_frame(
    script: &mut SimScript,
    cameras: &[String],
    known: Option<KnownPerson>,
) -> TrackingFrame {
    let mut rng = rand::thread_rng();
    if cameras.is_empty() {
        return TrackingFrame::Pong;
    }
    let camera_id = cameras[rng.gen_range(0..cameras.len())].clone();
    let sessions = script.sessions.entry(camera_id.clone()).or_default();
    let roll: f64 = rng.gen();

    if sessions.is_empty() || roll < 0.2 {
        for _ in 0..rng.gen_range(1..=2) {
            sessions.push(SimSession {
                session_id: Uuid::new_v4().to_string(),
                bbox: BoundingBox::new(
                    rng.gen_range(0.0..80.0),
                    rng.gen_range(0.0..70.0),
                    rng.gen_range(6.0..14.0),
                    rng.gen_range(18.0..30.0),
                ),
                person_id: None,
                name: None,
                loyalty: false,
                confidence: None,
            });
        }
        snapshot_frame(camera_id, sessions)
    } else if roll < 0.55 {
        let moves = sessions
            .iter_mut()
            .map(|session| {
                let dx = rng.gen_range(-3.0..3.0);
                let dy = rng.gen_range(-3.0..3.0);
                session.bbox = session.bbox.nudged(dx, dy);
                WireMove {
                    session_id: session.session_id.clone(),
                    dx,
                    dy,
                }
            })
            .collect();
        TrackingFrame::Motion { camera_id, moves }
    } else if roll < 0.8 {
        if let Some(session) = sessions.iter_mut().find(|s| s.person_id.is_none()) {
            match known.filter(|_| rng.gen_bool(0.5)) {
                Some(person) => {
                    session.person_id = Some(person.person_id);
                    session.name = Some(person.display_name);
                    session.loyalty = person.is_loyal_member;
                }
                None => {
                    session.person_id = Some(format!("sim-{}", Uuid::new_v4()));
                    session.loyalty = rng.gen_bool(0.3);
                }
            }
            session.confidence = Some(rng.gen_range(75.0..99.0));
        }
        snapshot_frame(camera_id, sessions)
    } else if roll < 0.9 {
        let removed = sessions.remove(rng.gen_range(0..sessions.len()));
        TrackingFrame::Remove {
            camera_id,
            session_id: removed.session_id,
        }
    } else {
        TrackingFrame::Pong
    }
}

fn snapshot_frame(camera_id: String, sessions: &[SimSession]) -> TrackingFrame {
    let objects = sessions
        .iter()
        .map(|s| WireObject {
            session_id: s.session_id.clone(),
            x: s.bbox.x,
            y: s.bbox.y,
            w: s.bbox.w,
            h: s.bbox.h,
            person_id: s.person_id.clone(),
            name: s.name.clone(),
            confidence: s.confidence,
            loyalty: s.person_id.is_some().then_some(s.loyalty),
        })
        .collect();
    TrackingFrame::TrackingUpdate { camera_id, objects }
}

const DASHBOARD_MESSAGES: [(&str, &str); 4] = [
    ("cam_001", "Promotion displayed on entrance screen"),
    ("cam_002", "Recommendation refresh completed"),
    ("cam_001", "Camera heartbeat OK"),
    ("cam_002", "Daily visitor summary updated"),
];

/// Rotates through ambient dashboard messages with the occasional pong
pub struct SimulatedDashboard {
    fault: Arc<dyn FaultPolicy>,
    interval: Duration,
}

impl SimulatedDashboard {
    pub fn new(fault: Arc<dyn FaultPolicy>, interval: Duration) -> Self {
        Self { fault, interval }
    }
}

struct DashboardState {
    fault: Arc<dyn FaultPolicy>,
    interval: Duration,
    emitted: u64,
    dropped: bool,
}

impl ChannelTransport for SimulatedDashboard {
    fn connect(&self) -> BoxFuture<'_, Result<FrameStream>> {
        let state = DashboardState {
            fault: self.fault.clone(),
            interval: self.interval,
            emitted: 0,
            dropped: false,
        };

        Box::pin(async move {
            tracing::debug!("Simulated dashboard channel opened");
            Ok(futures::stream::unfold(state, |mut state| async move {
                if state.dropped {
                    return None;
                }
                tokio::time::sleep(state.interval).await;
                state.emitted += 1;
                if state.fault.should_drop(state.emitted) {
                    state.dropped = true;
                    return Some((
                        Err(Error::Channel("injected connection drop".to_string())),
                        state,
                    ));
                }

                let frame = if state.emitted % 5 == 0 {
                    DashboardFrame::Pong
                } else {
                    let (camera, message) =
                        DASHBOARD_MESSAGES[(state.emitted as usize) % DASHBOARD_MESSAGES.len()];
                    DashboardFrame::NewLog {
                        data: WireLogEntry {
                            timestamp: Some(Utc::now().to_rfc3339()),
                            camera: camera.to_string(),
                            message: message.to_string(),
                        },
                    }
                };
                let line = serde_json::to_string(&frame).map_err(Error::from);
                Some((line, state))
            })
            .boxed())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracking(fault: Arc<dyn FaultPolicy>) -> SimulatedTracking {
        SimulatedTracking::new(
            Arc::new(IdentityRegistry::new()),
            vec!["cam_001".to_string(), "cam_002".to_string()],
            fault,
            Duration::from_millis(1),
        )
    }

    #[test]
    fn test_periodic_drop_boundaries() {
        let policy = PeriodicDrop { every: 3 };
        assert!(!policy.should_drop(0));
        assert!(!policy.should_drop(2));
        assert!(policy.should_drop(3));
        assert!(!policy.should_drop(4));
        assert!(policy.should_drop(6));
    }

    #[tokio::test]
    async fn test_tracking_frames_parse() {
        let sim = tracking(Arc::new(NoFaults));
        let mut stream = sim.connect().await.unwrap();

        for _ in 0..20 {
            let line = stream.next().await.unwrap().unwrap();
            let frame: TrackingFrame = serde_json::from_str(&line).unwrap();
            assert!(!matches!(frame, TrackingFrame::Unknown));
        }
    }

    #[tokio::test]
    async fn test_injected_drop_ends_stream() {
        let sim = tracking(Arc::new(PeriodicDrop { every: 3 }));
        let mut stream = sim.connect().await.unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_script_survives_reconnect() {
        let sim = tracking(Arc::new(PeriodicDrop { every: 5 }));

        let first: Vec<_> = sim.connect().await.unwrap().collect().await;
        assert!(first.last().unwrap().is_err());

        // Fresh connection picks the script back up and keeps producing
        // valid frames for the same cameras
        let mut stream = sim.connect().await.unwrap();
        for _ in 0..4 {
            let line = stream.next().await.unwrap().unwrap();
            let frame: TrackingFrame = serde_json::from_str(&line).unwrap();
            assert!(!matches!(frame, TrackingFrame::Unknown));
        }
    }

    #[tokio::test]
    async fn test_dashboard_messages_never_raise_alerts() {
        let sim = SimulatedDashboard::new(Arc::new(NoFaults), Duration::from_millis(1));
        let mut stream = sim.connect().await.unwrap();

        for _ in 0..10 {
            let line = stream.next().await.unwrap().unwrap();
            let frame: DashboardFrame = serde_json::from_str(&line).unwrap();
            if let DashboardFrame::NewLog { data } = frame {
                assert!(!data.message.to_ascii_lowercase().contains("identified"));
            }
        }
    }
}

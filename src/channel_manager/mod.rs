//! Channel Manager - Streaming Connection Lifecycle
//!
//! ## Responsibilities
//! - Own the connect / read / reconnect loop for one streaming channel
//! - Route each received frame to the component that consumes it
//! - Reconnect with exponential backoff and reset the backoff on success
//! - Record connection lifecycle entries in the event log
//! - Tear down cleanly: after `stop()` no further state is mutated

mod simulated;
mod transport;
mod types;

pub use simulated::{FaultPolicy, NoFaults, PeriodicDrop, SimulatedDashboard, SimulatedTracking};
pub use transport::{ChannelTransport, FrameStream, HttpStreamTransport};
pub use types::*;

use crate::error::Error;
use crate::event_log::{EventLog, LogEntry};
use crate::track_store::{MotionDelta, TrackStore};
use futures::future::BoxFuture;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Consumes raw frames received on a channel
pub trait FrameRouter: Send + Sync {
    fn route<'a>(&'a self, raw: &'a str) -> BoxFuture<'a, ()>;
}

/// Routes tracking channel frames into the track store
pub struct TrackingRouter {
    store: Arc<TrackStore>,
}

impl TrackingRouter {
    pub fn new(store: Arc<TrackStore>) -> Self {
        Self { store }
    }
}

impl FrameRouter for TrackingRouter {
    fn route<'a>(&'a self, raw: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let frame: TrackingFrame = match serde_json::from_str(raw) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(error = %e, "Malformed tracking frame dropped");
                    return;
                }
            };
            match frame {
                TrackingFrame::TrackingUpdate { camera_id, objects } => {
                    let snapshots = objects.into_iter().map(WireObject::into_snapshot).collect();
                    self.store.apply_full_replace(&camera_id, snapshots).await;
                }
                TrackingFrame::Motion { camera_id, moves } => {
                    let deltas = moves
                        .into_iter()
                        .map(|m| MotionDelta {
                            session_id: m.session_id,
                            dx: m.dx,
                            dy: m.dy,
                        })
                        .collect();
                    self.store.apply_motion(&camera_id, deltas).await;
                }
                TrackingFrame::Remove { camera_id, session_id } => {
                    self.store.remove_object(&camera_id, &session_id).await;
                }
                TrackingFrame::Pong => {}
                TrackingFrame::Unknown => {
                    tracing::debug!("Unrecognized tracking frame type skipped");
                }
            }
        })
    }
}

/// Routes dashboard channel frames into the event log
pub struct DashboardRouter {
    log: Arc<EventLog>,
}

impl DashboardRouter {
    pub fn new(log: Arc<EventLog>) -> Self {
        Self { log }
    }
}

impl FrameRouter for DashboardRouter {
    fn route<'a>(&'a self, raw: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let frame: DashboardFrame = match serde_json::from_str(raw) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(error = %e, "Malformed dashboard frame dropped");
                    return;
                }
            };
            match frame {
                DashboardFrame::NewLog { data } => {
                    self.log.append(data.into_entry()).await;
                }
                DashboardFrame::Pong => {}
                DashboardFrame::Unknown => {
                    tracing::debug!("Unrecognized dashboard frame type skipped");
                }
            }
        })
    }
}

/// Exponential reconnect backoff, reset on every successful connect
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub cap: Duration,
}

impl BackoffPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        (self.initial * 2u32.pow(attempt.min(16))).min(self.cap)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            cap: Duration::from_secs(10),
        }
    }
}

pub struct ChannelManager {
    label: String,
    transport: Arc<dyn ChannelTransport>,
    router: Arc<dyn FrameRouter>,
    event_log: Arc<EventLog>,
    status: Arc<RwLock<ChannelStatus>>,
    alive: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
    backoff: BackoffPolicy,
    connects: Arc<AtomicU64>,
}

impl ChannelManager {
    pub fn new(
        label: &str,
        transport: Arc<dyn ChannelTransport>,
        router: Arc<dyn FrameRouter>,
        event_log: Arc<EventLog>,
    ) -> Self {
        Self {
            label: label.to_string(),
            transport,
            router,
            event_log,
            status: Arc::new(RwLock::new(ChannelStatus::Connecting)),
            alive: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
            backoff: BackoffPolicy::default(),
            connects: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Spawn the connection loop. A second call while running is ignored.
    pub async fn start(&self) {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            tracing::warn!(channel = %self.label, "Channel already started");
            return;
        }
        self.alive.store(true, Ordering::SeqCst);

        let task = ChannelTask {
            label: self.label.clone(),
            transport: self.transport.clone(),
            router: self.router.clone(),
            event_log: self.event_log.clone(),
            status: self.status.clone(),
            alive: self.alive.clone(),
            backoff: self.backoff,
            connects: self.connects.clone(),
        };
        *handle = Some(tokio::spawn(async move { task.run().await }));
        tracing::info!(channel = %self.label, "Channel started");
    }

    /// Stop the loop. The liveness flag drops first so a frame already in
    /// flight cannot mutate state after the abort.
    pub async fn stop(&self) {
        self.alive.store(false, Ordering::SeqCst);
        let mut handle = self.handle.lock().await;
        if let Some(task) = handle.take() {
            task.abort();
        }
        let mut status = self.status.write().await;
        *status = ChannelStatus::Disconnected;
        tracing::info!(channel = %self.label, "Channel stopped");
    }

    pub async fn status(&self) -> ChannelStatus {
        *self.status.read().await
    }

    /// Successful connects since creation, reconnects included
    pub fn connect_count(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

struct ChannelTask {
    label: String,
    transport: Arc<dyn ChannelTransport>,
    router: Arc<dyn FrameRouter>,
    event_log: Arc<EventLog>,
    status: Arc<RwLock<ChannelStatus>>,
    alive: Arc<AtomicBool>,
    backoff: BackoffPolicy,
    connects: Arc<AtomicU64>,
}

impl ChannelTask {
    async fn run(self) {
        let mut attempt: u32 = 0;
        loop {
            if !self.alive.load(Ordering::SeqCst) {
                return;
            }
            self.set_status(ChannelStatus::Connecting).await;

            match self.transport.connect().await {
                Ok(mut frames) => {
                    attempt = 0;
                    let nth = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
                    let message = if nth == 1 {
                        "Connection established"
                    } else {
                        "Reconnected successfully"
                    };
                    self.event_log
                        .append(LogEntry::now(&self.label, message.to_string()))
                        .await;
                    self.set_status(ChannelStatus::Connected).await;

                    while let Some(frame) = frames.next().await {
                        if !self.alive.load(Ordering::SeqCst) {
                            return;
                        }
                        match frame {
                            Ok(raw) => self.router.route(&raw).await,
                            Err(Error::Parse(reason)) => {
                                tracing::warn!(
                                    channel = %self.label,
                                    error = %reason,
                                    "Malformed frame dropped"
                                );
                            }
                            Err(e) => {
                                tracing::warn!(channel = %self.label, error = %e, "Stream failed");
                                break;
                            }
                        }
                    }

                    if !self.alive.load(Ordering::SeqCst) {
                        return;
                    }
                    self.set_status(ChannelStatus::Disconnected).await;
                    self.event_log
                        .append(LogEntry::now(
                            &self.label,
                            "Connection lost, reconnecting".to_string(),
                        ))
                        .await;
                }
                Err(e) => {
                    tracing::warn!(channel = %self.label, error = %e, "Connect failed");
                    self.set_status(ChannelStatus::Disconnected).await;
                }
            }

            let delay = self.backoff.delay(attempt);
            attempt = attempt.saturating_add(1);
            tokio::time::sleep(delay).await;
            if !self.alive.load(Ordering::SeqCst) {
                return;
            }
        }
    }

    async fn set_status(&self, next: ChannelStatus) {
        let mut status = self.status.write().await;
        if *status != next {
            tracing::debug!(channel = %self.label, status = ?next, "Channel status changed");
        }
        *status = next;
    }
}

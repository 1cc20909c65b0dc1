//! Event Log - Bounded Activity Feed
//!
//! ## Responsibilities
//! - Keep the most recent activity entries in a fixed-capacity buffer,
//!   newest first
//! - Accept a one-shot seed of historical entries fetched from the gateway
//! - Maintain the alert counter, locally from appended entries and
//!   authoritatively from the gateway's alert poll

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Entries kept before the oldest are evicted
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub camera: String,
    pub message: String,
}

impl LogEntry {
    pub fn now(camera: &str, message: String) -> Self {
        Self {
            timestamp: Utc::now(),
            camera: camera.to_string(),
            message,
        }
    }
}

struct LogBuffer {
    /// Front is newest
    entries: VecDeque<LogEntry>,
    capacity: usize,
    seeded: bool,
    alert_count: u64,
}

pub struct EventLog {
    inner: RwLock<LogBuffer>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(LogBuffer {
                entries: VecDeque::with_capacity(capacity),
                capacity,
                seeded: false,
                alert_count: 0,
            }),
        }
    }

    /// Load historical entries fetched from the gateway, most recent first.
    ///
    /// Entries appended live before the fetch completes stay ahead of the
    /// seed. Seeded entries never touch the alert counter; the gateway
    /// already counted them. Repeated seeding is ignored.
    pub async fn seed(&self, entries: Vec<LogEntry>) {
        let mut buffer = self.inner.write().await;
        if buffer.seeded {
            tracing::warn!("Event log already seeded, ignoring");
            return;
        }
        buffer.seeded = true;
        for entry in entries {
            buffer.entries.push_back(entry);
        }
        let capacity = buffer.capacity;
        buffer.entries.truncate(capacity);
        tracing::debug!(count = buffer.entries.len(), "Event log seeded");
    }

    /// Append a live entry, evicting the oldest once over capacity.
    ///
    /// An entry whose message mentions an identification bumps the local
    /// alert counter.
    // TODO: count from a structured alert flag once the gateway exposes one;
    // substring matching would double-count any future phrase containing
    // "identified".
    pub async fn append(&self, entry: LogEntry) {
        let mut buffer = self.inner.write().await;
        if entry.message.to_ascii_lowercase().contains("identified") {
            buffer.alert_count += 1;
        }
        buffer.entries.push_front(entry);
        let capacity = buffer.capacity;
        buffer.entries.truncate(capacity);
    }

    /// Snapshot of the buffer, newest first
    pub async fn entries(&self) -> Vec<LogEntry> {
        let buffer = self.inner.read().await;
        buffer.entries.iter().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        let buffer = self.inner.read().await;
        buffer.entries.len()
    }

    pub async fn alert_count(&self) -> u64 {
        let buffer = self.inner.read().await;
        buffer.alert_count
    }

    /// Overwrite the local counter with the gateway's authoritative value
    pub async fn sync_alert_count(&self, count: u64) {
        let mut buffer = self.inner.write().await;
        if buffer.alert_count != count {
            tracing::debug!(
                local = buffer.alert_count,
                gateway = count,
                "Alert count synced from gateway"
            );
        }
        buffer.alert_count = count;
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

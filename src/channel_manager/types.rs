//! Channel wire types and frame definitions

use crate::event_log::LogEntry;
use crate::identity_registry::IdentityCandidate;
use crate::track_store::{BoundingBox, ObjectSnapshot};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a streaming channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// One object inside a tracking snapshot frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireObject {
    pub session_id: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub w: f64,
    #[serde(default)]
    pub h: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loyalty: Option<bool>,
}

impl WireObject {
    pub fn into_snapshot(self) -> ObjectSnapshot {
        let identity = if self.person_id.is_some() || self.name.is_some() {
            Some(IdentityCandidate {
                person_id: self.person_id,
                display_name: self.name,
                confidence: self.confidence,
                is_loyal_member: self.loyalty,
            })
        } else {
            None
        };
        ObjectSnapshot {
            session_id: self.session_id,
            bbox: BoundingBox::new(self.x, self.y, self.w, self.h),
            confidence: self.confidence,
            identity,
        }
    }
}

/// One per-session delta inside a motion frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMove {
    pub session_id: String,
    #[serde(default)]
    pub dx: f64,
    #[serde(default)]
    pub dy: f64,
}

/// Frames on the tracking channel.
///
/// Unrecognized frame types parse into `Unknown` and are skipped, so new
/// upstream frame kinds do not tear the connection down.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackingFrame {
    TrackingUpdate {
        camera_id: String,
        #[serde(default)]
        objects: Vec<WireObject>,
    },
    Motion {
        camera_id: String,
        #[serde(default)]
        moves: Vec<WireMove>,
    },
    Remove {
        camera_id: String,
        session_id: String,
    },
    Pong,
    #[serde(other)]
    Unknown,
}

/// Frames on the dashboard channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardFrame {
    NewLog { data: WireLogEntry },
    Pong,
    #[serde(other)]
    Unknown,
}

/// Log entry as the gateway sends it.
///
/// Gateway timestamps are ISO strings without a timezone suffix, so they
/// are parsed leniently and fall back to the receive time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireLogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub camera: String,
    pub message: String,
}

impl WireLogEntry {
    pub fn into_entry(self) -> LogEntry {
        LogEntry {
            timestamp: parse_timestamp(self.timestamp.as_deref()),
            camera: self.camera,
            message: self.message,
        }
    }
}

fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = raw else {
        return Utc::now();
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.and_utc();
    }
    tracing::debug!(timestamp = %raw, "Unparseable log timestamp, using receive time");
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_tracking_update_frame_parses() {
        let raw = r#"{
            "type": "tracking_update",
            "camera_id": "cam_001",
            "objects": [
                {"session_id": "s-1", "x": 10.0, "y": 20.0, "w": 10.0, "h": 25.0},
                {"session_id": "s-2", "x": 1.0, "y": 2.0, "w": 3.0, "h": 4.0,
                 "person_id": "p-1", "name": "Alice", "confidence": 93.4, "loyalty": true}
            ]
        }"#;

        let frame: TrackingFrame = serde_json::from_str(raw).unwrap();
        let TrackingFrame::TrackingUpdate { camera_id, objects } = frame else {
            panic!("expected tracking_update");
        };
        assert_eq!(camera_id, "cam_001");
        assert_eq!(objects.len(), 2);

        let anonymous = objects[0].clone().into_snapshot();
        assert!(anonymous.identity.is_none());

        let identified = objects[1].clone().into_snapshot();
        let identity = identified.identity.unwrap();
        assert_eq!(identity.person_id.as_deref(), Some("p-1"));
        assert_eq!(identity.is_loyal_member, Some(true));
    }

    #[test]
    fn test_motion_and_remove_frames_parse() {
        let motion: TrackingFrame = serde_json::from_str(
            r#"{"type": "motion", "camera_id": "cam_001", "moves": [{"session_id": "s-1", "dx": 2.5, "dy": -1.0}]}"#,
        )
        .unwrap();
        assert!(matches!(motion, TrackingFrame::Motion { ref moves, .. } if moves.len() == 1));

        let remove: TrackingFrame = serde_json::from_str(
            r#"{"type": "remove", "camera_id": "cam_001", "session_id": "s-1"}"#,
        )
        .unwrap();
        assert!(matches!(remove, TrackingFrame::Remove { ref session_id, .. } if session_id == "s-1"));
    }

    #[test]
    fn test_unrecognized_frame_type_maps_to_unknown() {
        let frame: TrackingFrame =
            serde_json::from_str(r#"{"type": "camera_calibration", "payload": 42}"#).unwrap();
        assert!(matches!(frame, TrackingFrame::Unknown));

        let pong: TrackingFrame = serde_json::from_str(r#"{"type": "pong"}"#).unwrap();
        assert!(matches!(pong, TrackingFrame::Pong));
    }

    #[test]
    fn test_dashboard_frame_ignores_envelope_extras() {
        let raw = r#"{
            "type": "new_log",
            "data": {"timestamp": "2026-08-25T10:30:00.123456", "camera": "cam_002", "message": "Promotion displayed"},
            "timestamp": "2026-08-25T10:30:00.200000"
        }"#;

        let frame: DashboardFrame = serde_json::from_str(raw).unwrap();
        let DashboardFrame::NewLog { data } = frame else {
            panic!("expected new_log");
        };
        let entry = data.into_entry();
        assert_eq!(entry.camera, "cam_002");
        assert_eq!(entry.timestamp.minute(), 30);
    }

    #[test]
    fn test_timestamp_parse_accepts_naive_and_rfc3339() {
        let naive = parse_timestamp(Some("2026-08-25T10:30:00.123456"));
        assert_eq!(naive.hour(), 10);

        let zoned = parse_timestamp(Some("2026-08-25T10:30:00+02:00"));
        assert_eq!(zoned.hour(), 8);

        // Garbage falls back to the receive time instead of failing
        let _ = parse_timestamp(Some("not a timestamp"));
        let _ = parse_timestamp(None);
    }
}

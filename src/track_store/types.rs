//! Tracked-object domain types

use crate::identity_registry::IdentityCandidate;
use serde::{Deserialize, Serialize};

/// Bounding box in frame-percentage coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Clamp so the box lies fully inside the [0,100] percent frame
    pub fn clamped(self) -> Self {
        let w = self.w.clamp(0.0, 100.0);
        let h = self.h.clamp(0.0, 100.0);
        Self {
            x: self.x.clamp(0.0, 100.0 - w),
            y: self.y.clamp(0.0, 100.0 - h),
            w,
            h,
        }
    }

    /// Shift by a delta and clamp back into the frame
    pub fn nudged(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
        .clamped()
    }
}

/// A visible object in one camera's view
///
/// The two variants make the anonymous-to-identified transition one-way by
/// construction: identity fields exist only on `Identified`, so an
/// identified object cannot silently lose its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrackedObject {
    Tracking {
        session_id: String,
        bbox: BoundingBox,
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
    },
    Identified {
        session_id: String,
        bbox: BoundingBox,
        person_id: String,
        display_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
        is_loyal_member: bool,
    },
}

impl TrackedObject {
    pub fn session_id(&self) -> &str {
        match self {
            TrackedObject::Tracking { session_id, .. } => session_id,
            TrackedObject::Identified { session_id, .. } => session_id,
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        match self {
            TrackedObject::Tracking { bbox, .. } => *bbox,
            TrackedObject::Identified { bbox, .. } => *bbox,
        }
    }

    pub fn bbox_mut(&mut self) -> &mut BoundingBox {
        match self {
            TrackedObject::Tracking { bbox, .. } => bbox,
            TrackedObject::Identified { bbox, .. } => bbox,
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            TrackedObject::Tracking { confidence, .. } => *confidence,
            TrackedObject::Identified { confidence, .. } => *confidence,
        }
    }

    pub fn is_identified(&self) -> bool {
        matches!(self, TrackedObject::Identified { .. })
    }
}

/// One object in an authoritative snapshot
#[derive(Debug, Clone, Default)]
pub struct ObjectSnapshot {
    pub session_id: String,
    pub bbox: BoundingBox,
    pub confidence: Option<f64>,
    /// Present when the update carries an identification for this session
    pub identity: Option<IdentityCandidate>,
}

/// Per-session nudge applied by a motion frame
#[derive(Debug, Clone)]
pub struct MotionDelta {
    pub session_id: String,
    pub dx: f64,
    pub dy: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_pulls_box_inside_frame() {
        let bbox = BoundingBox::new(95.0, -10.0, 10.0, 24.0).clamped();
        assert_eq!(bbox.x, 90.0);
        assert_eq!(bbox.y, 0.0);

        let oversized = BoundingBox::new(0.0, 0.0, 150.0, 150.0).clamped();
        assert_eq!(oversized.w, 100.0);
        assert_eq!(oversized.x, 0.0);
    }

    #[test]
    fn test_nudged_stays_within_frame() {
        let mut bbox = BoundingBox::new(50.0, 50.0, 10.0, 20.0);
        for _ in 0..100 {
            bbox = bbox.nudged(7.0, -9.0);
            assert!(bbox.x >= 0.0 && bbox.x <= 100.0 - bbox.w);
            assert!(bbox.y >= 0.0 && bbox.y <= 100.0 - bbox.h);
        }
        assert_eq!(bbox.x, 90.0);
        assert_eq!(bbox.y, 0.0);
    }

    #[test]
    fn test_tracked_object_state_tag() {
        let object = TrackedObject::Tracking {
            session_id: "s-1".to_string(),
            bbox: BoundingBox::new(1.0, 2.0, 3.0, 4.0),
            confidence: None,
        };
        let json = serde_json::to_string(&object).unwrap();
        assert!(json.contains("\"state\":\"tracking\""));
        assert!(!json.contains("confidence"));
    }
}

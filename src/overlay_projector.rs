//! Overlay Projector - Tracked Objects to Drawable Boxes
//!
//! ## Responsibilities
//! - Project tracked objects into presentation-ready overlay boxes
//! - Pick border style and label from the identification state
//! - Render captions with loyalty and confidence markers

use crate::track_store::{BoundingBox, TrackedObject};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    /// Anonymous object, still tracking
    Dashed,
    /// Identified person
    Solid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayBox {
    pub session_id: String,
    pub bbox: BoundingBox,
    pub label: String,
    pub border: BorderStyle,
    pub is_loyal_member: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl OverlayBox {
    /// Display caption: label, loyalty star, confidence percentage.
    /// Confidence arrives on a 0..100 scale.
    pub fn caption(&self) -> String {
        let mut caption = self.label.clone();
        if self.is_loyal_member {
            caption.push_str(" \u{2605}");
        }
        if let Some(confidence) = self.confidence {
            caption.push_str(&format!(" ({:.0}%)", confidence));
        }
        caption
    }
}

/// Project a camera's tracked objects into overlay boxes, in tracking order
pub fn project(objects: &[TrackedObject]) -> Vec<OverlayBox> {
    objects.iter().map(project_one).collect()
}

fn project_one(object: &TrackedObject) -> OverlayBox {
    match object {
        TrackedObject::Tracking { session_id, bbox, confidence } => OverlayBox {
            session_id: session_id.clone(),
            bbox: *bbox,
            label: "Human".to_string(),
            border: BorderStyle::Dashed,
            is_loyal_member: false,
            confidence: *confidence,
        },
        TrackedObject::Identified {
            session_id,
            bbox,
            display_name,
            confidence,
            is_loyal_member,
            ..
        } => OverlayBox {
            session_id: session_id.clone(),
            bbox: *bbox,
            label: display_name.clone(),
            border: BorderStyle::Solid,
            is_loyal_member: *is_loyal_member,
            confidence: *confidence,
        },
    }
}

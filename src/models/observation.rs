use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CapturedFrame, Emotion};
use crate::zone;

/// Face bounding box in unmirrored source-frame pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BoundingBox {
    /// Builds a box from `[x, y, w, h]`. Short or non-finite input yields `None`.
    pub fn from_components(components: &[f64]) -> Option<Self> {
        if components.len() < 4 || components[..4].iter().any(|c| !c.is_finite()) {
            return None;
        }
        Some(Self {
            x: components[0],
            y: components[1],
            w: components[2],
            h: components[3],
        })
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// One classifier result for one captured frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameObservation {
    pub detected: bool,
    pub emotion: Option<Emotion>,
    pub confidence: f64,
    pub face_count: u32,
    pub bbox: Option<BoundingBox>,
    pub frame_width: u32,
    pub frame_height: u32,
    pub timestamp: DateTime<Utc>,
}

impl FrameObservation {
    /// The "nothing seen" observation used for failed or timed-out classifier calls.
    pub fn empty(frame: &CapturedFrame) -> Self {
        Self {
            detected: false,
            emotion: None,
            confidence: 0.0,
            face_count: 0,
            bbox: None,
            frame_width: frame.width,
            frame_height: frame.height,
            timestamp: frame.captured_at,
        }
    }

    /// A face was found and sits inside the capture zone.
    pub fn in_zone(&self) -> bool {
        self.detected
            && self
                .bbox
                .map(|bbox| zone::box_in_zone(&bbox, self.frame_width, self.frame_height))
                .unwrap_or(false)
    }

    /// The vote this observation contributes to an open window, if any.
    pub fn vote(&self) -> Option<Vote> {
        if !self.in_zone() {
            return None;
        }
        self.emotion.map(|emotion| Vote {
            emotion,
            confidence: self.confidence,
        })
    }
}

/// An emotion/confidence pair accepted into the open window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Vote {
    pub emotion: Emotion,
    pub confidence: f64,
}

impl Vote {
    pub fn new(emotion: Emotion, confidence: f64) -> Self {
        Self {
            emotion,
            confidence,
        }
    }
}

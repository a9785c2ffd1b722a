pub mod http;

use anyhow::Result;
use serde::Deserialize;

use crate::models::{BoundingBox, CapturedFrame, Emotion, FrameObservation};

pub use http::HttpClassifier;

/// Face detection plus emotion classification for one frame.
///
/// Calls block; the capture loop runs them on the blocking pool under a deadline.
pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, frame: &CapturedFrame) -> Result<FrameObservation>;

    fn is_healthy(&self) -> bool {
        true
    }
}

/// Reply body of `POST /api/detect`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClassifierResponse {
    pub detected: bool,
    pub emotion: Option<String>,
    pub confidence: f64,
    pub face_count: u32,
    pub bbox: Option<Vec<f64>>,
}

impl ClassifierResponse {
    /// Pairs the reply with the frame it was computed for.
    ///
    /// Labels outside the known set keep the face but drop the emotion, so the frame
    /// still counts for zone presence without casting a vote.
    pub fn into_observation(self, frame: &CapturedFrame) -> FrameObservation {
        let emotion = self.emotion.as_deref().and_then(|label| {
            let parsed = Emotion::parse(label);
            if parsed.is_none() {
                log::debug!("ignoring unknown classifier label {label:?}");
            }
            parsed
        });
        let confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };

        FrameObservation {
            detected: self.detected,
            emotion,
            confidence,
            face_count: self.face_count,
            bbox: self.bbox.as_deref().and_then(BoundingBox::from_components),
            frame_width: frame.width,
            frame_height: frame.height,
            timestamp: frame.captured_at,
        }
    }
}

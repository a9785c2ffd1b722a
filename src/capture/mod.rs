pub mod controller;
pub mod loop_worker;
pub mod source;

use serde::{Deserialize, Serialize};
use tokio::time::Duration;

pub use controller::CaptureController;
pub use loop_worker::capture_loop;
pub use source::{DirectoryFrameSource, FrameSource};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    /// Gap between capture ticks.
    pub interval_ms: u64,
    /// Deadline for one classifier round trip; a late reply counts as no detection.
    pub classify_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: 200,
            classify_timeout_ms: 2000,
        }
    }
}

impl CaptureConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }
}

use std::fmt;

use chrono::{DateTime, Utc};

/// One encoded still captured from the video feed.
///
/// The classifier receives the encoded bytes; the dimensions travel with the frame
/// because the zone test needs them and the classifier response does not echo them.
#[derive(Clone)]
pub struct CapturedFrame {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

impl fmt::Debug for CapturedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedFrame")
            .field("bytes", &self.jpeg.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

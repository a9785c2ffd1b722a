//! Face-in-zone gate.
//!
//! The kiosk shows a mirrored feed, so a face on the viewer's left is on the
//! right of the source frame. Bounding boxes come back in source coordinates and
//! are flipped horizontally before testing them against the capture ellipse.

use crate::models::BoundingBox;

/// Center of the capture ellipse in normalized, mirrored coordinates.
pub const ZONE_CENTER: (f64, f64) = (0.50, 0.45);

/// Ellipse radii plus the containment threshold applied to `dx² + dy²`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZonePreset {
    pub rx: f64,
    pub ry: f64,
    pub threshold: f64,
}

/// Preset for frames at least as wide as they are tall.
pub const LANDSCAPE: ZonePreset = ZonePreset {
    rx: 0.18,
    ry: 0.30,
    threshold: 1.0,
};

/// Preset for tall frames. The 1.2 threshold is looser than landscape's 1.0 to
/// forgive handheld framing; the numbers are kept exactly as tuned on site.
pub const PORTRAIT: ZonePreset = ZonePreset {
    rx: 0.35,
    ry: 0.25,
    threshold: 1.2,
};

impl ZonePreset {
    pub fn for_frame(frame_width: u32, frame_height: u32) -> Self {
        if frame_width >= frame_height {
            LANDSCAPE
        } else {
            PORTRAIT
        }
    }

    /// Normalized squared ellipse distance `dx² + dy²` of a mirrored point.
    pub fn ellipse_distance(&self, x_norm: f64, y_norm: f64) -> f64 {
        let dx = (x_norm - ZONE_CENTER.0) / self.rx;
        let dy = (y_norm - ZONE_CENTER.1) / self.ry;
        dx * dx + dy * dy
    }

    pub fn contains(&self, x_norm: f64, y_norm: f64) -> bool {
        self.ellipse_distance(x_norm, y_norm) <= self.threshold
    }
}

/// Mirrored, normalized center of a bounding box. `None` for degenerate frames.
pub fn normalized_center(bbox: &BoundingBox, frame_width: u32, frame_height: u32) -> Option<(f64, f64)> {
    if frame_width == 0 || frame_height == 0 {
        return None;
    }
    let (cx, cy) = bbox.center();
    let x_norm = 1.0 - cx / frame_width as f64;
    let y_norm = cy / frame_height as f64;
    if !x_norm.is_finite() || !y_norm.is_finite() {
        return None;
    }
    Some((x_norm, y_norm))
}

pub fn box_in_zone(bbox: &BoundingBox, frame_width: u32, frame_height: u32) -> bool {
    let Some((x_norm, y_norm)) = normalized_center(bbox, frame_width, frame_height) else {
        return false;
    };
    ZonePreset::for_frame(frame_width, frame_height).contains(x_norm, y_norm)
}

/// Is the reported face inside the capture zone. Missing or short boxes are
/// simply "not in zone".
pub fn is_in_zone(bbox: Option<&[f64]>, frame_width: u32, frame_height: u32) -> bool {
    bbox.and_then(BoundingBox::from_components)
        .map(|bbox| box_in_zone(&bbox, frame_width, frame_height))
        .unwrap_or(false)
}

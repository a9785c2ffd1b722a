use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use log::info;

use crate::models::CapturedFrame;

/// Widest frame sent to the classifier. The backend works at this width and
/// reports boxes in those pixels, so larger stills are scaled down up front.
pub const MAX_FRAME_WIDTH: u32 = 640;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// Produces encoded frames for the capture loop. `Ok(None)` means the source is done.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>>;
}

struct EncodedStill {
    jpeg: Vec<u8>,
    width: u32,
    height: u32,
}

/// Replays the still images of a directory in file-name order.
pub struct DirectoryFrameSource {
    stills: Vec<EncodedStill>,
    cursor: usize,
    looping: bool,
}

impl DirectoryFrameSource {
    pub fn open(dir: &Path, looping: bool) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read frames directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image(path))
            .collect();
        paths.sort();

        if paths.is_empty() {
            bail!("no still images found in {}", dir.display());
        }

        let stills = paths
            .iter()
            .map(|path| {
                let img = image::open(path)
                    .with_context(|| format!("failed to decode {}", path.display()))?;
                encode_still(img).with_context(|| format!("failed to encode {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        info!("loaded {} frames from {}", stills.len(), dir.display());
        Ok(Self {
            stills,
            cursor: 0,
            looping,
        })
    }

    pub fn len(&self) -> usize {
        self.stills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stills.is_empty()
    }
}

impl FrameSource for DirectoryFrameSource {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>> {
        if self.cursor >= self.stills.len() {
            if !self.looping || self.stills.is_empty() {
                return Ok(None);
            }
            self.cursor = 0;
        }
        let still = &self.stills[self.cursor];
        self.cursor += 1;

        Ok(Some(CapturedFrame {
            jpeg: still.jpeg.clone(),
            width: still.width,
            height: still.height,
            captured_at: Utc::now(),
        }))
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn encode_still(img: DynamicImage) -> Result<EncodedStill> {
    let img = if img.width() > MAX_FRAME_WIDTH {
        img.resize(MAX_FRAME_WIDTH, u32::MAX, FilterType::Triangle)
    } else {
        img
    };
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut jpeg = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .context("jpeg encoding failed")?;

    Ok(EncodedStill {
        jpeg,
        width: rgb.width(),
        height: rgb.height(),
    })
}

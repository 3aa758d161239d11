//! Fit-policy geometry over a decoded image's dimensions.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Pixel dimensions produced by the fit policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SizeBox {
    pub width: u32,
    pub height: u32,
}

impl SizeBox {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Decoded size information handed to per-file option callbacks.
///
/// Exposes the decoded width and height, the source path, and the three fit
/// policies bound to that size. Every policy takes a target width and an
/// optional target height; an omitted height means a square box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
    path: PathBuf,
}

impl ImageSize {
    pub fn new(width: u32, height: u32, path: impl Into<PathBuf>) -> Self {
        Self {
            width,
            height,
            path: path.into(),
        }
    }

    /// Path of the file the image was decoded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> SizeBox {
        SizeBox::new(self.width, self.height)
    }

    /// Scales to fit entirely within the box, keeping the aspect ratio.
    pub fn contain(&self, target_width: u32, target_height: Option<u32>) -> SizeBox {
        let target_height = target_height.unwrap_or(target_width);
        let (scale_w, scale_h) = self.axis_scales(target_width, target_height);
        self.scaled(scale_w.min(scale_h))
    }

    /// Like [`contain`](Self::contain), but never enlarges an image that
    /// already fits inside the box.
    pub fn scale_down(&self, target_width: u32, target_height: Option<u32>) -> SizeBox {
        let target_height = target_height.unwrap_or(target_width);
        if target_width > self.width && target_height > self.height {
            return self.size();
        }
        self.contain(target_width, Some(target_height))
    }

    /// Scales to cover the whole box, keeping the aspect ratio.
    ///
    /// The result is not cropped to the box.
    pub fn cover(&self, target_width: u32, target_height: Option<u32>) -> SizeBox {
        let target_height = target_height.unwrap_or(target_width);
        let (scale_w, scale_h) = self.axis_scales(target_width, target_height);
        self.scaled(scale_w.max(scale_h))
    }

    fn axis_scales(&self, target_width: u32, target_height: u32) -> (f64, f64) {
        (
            f64::from(target_width) / f64::from(self.width),
            f64::from(target_height) / f64::from(self.height),
        )
    }

    // f64::round rounds half away from zero; each axis is rounded on its own.
    fn scaled(&self, scale: f64) -> SizeBox {
        SizeBox::new(
            (f64::from(self.width) * scale).round() as u32,
            (f64::from(self.height) * scale).round() as u32,
        )
    }
}

//! Image acquisition for the live loop
//!
//! Reading screen pixels is platform specific and lives outside this crate;
//! the loop only sees the [`ScreenGrabber`] trait. [`FileGrabber`] re-reads
//! an image file every tick and crops the region out of it, which is enough
//! to drive the loop from a screenshot tool that overwrites a file.

pub mod region;

pub use region::{CaptureRegion, DEFAULT_REGION_FILE};

use crate::error::ScanError;
use image::DynamicImage;
use std::path::{Path, PathBuf};

/// Source of region images
pub trait ScreenGrabber: Send + Sync {
    /// Capture the pixels inside `region`
    fn grab(&self, region: &CaptureRegion) -> Result<DynamicImage, ScanError>;
}

/// Grabs regions out of an image file on disk
pub struct FileGrabber {
    path: PathBuf,
}

impl FileGrabber {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScreenGrabber for FileGrabber {
    fn grab(&self, region: &CaptureRegion) -> Result<DynamicImage, ScanError> {
        let screen = image::open(&self.path).map_err(|e| {
            ScanError::CaptureError(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        crop(&screen, region)
    }
}

/// Cut `region` out of `screen`, clipped to the screen bounds
pub fn crop(screen: &DynamicImage, region: &CaptureRegion) -> Result<DynamicImage, ScanError> {
    let left = region.left.max(0) as u32;
    let top = region.top.max(0) as u32;
    if left >= screen.width() || top >= screen.height() {
        return Err(ScanError::CaptureError(format!(
            "Region {} lies outside the {}x{} screen",
            region,
            screen.width(),
            screen.height()
        )));
    }

    let width = region.width.min(screen.width() - left);
    let height = region.height.min(screen.height() - top);
    if width == 0 || height == 0 {
        return Err(ScanError::CaptureError(format!("Region {} is empty", region)));
    }

    Ok(screen.crop_imm(left, top, width, height))
}

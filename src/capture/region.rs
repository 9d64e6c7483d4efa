use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default file the capture rectangle is persisted to
pub const DEFAULT_REGION_FILE: &str = "screen_region.json";

/// Screen rectangle watched by the live loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Parse `left,top,width,height`
    pub fn parse(s: &str) -> Result<Self, ScanError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let invalid = || ScanError::InvalidRequest(format!("Invalid region '{}', expected left,top,width,height", s));

        let [left, top, width, height] = parts.as_slice() else {
            return Err(invalid());
        };

        Ok(Self {
            left: left.parse().map_err(|_| invalid())?,
            top: top.parse().map_err(|_| invalid())?,
            width: width.parse().map_err(|_| invalid())?,
            height: height.parse().map_err(|_| invalid())?,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ScanError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ScanError::Internal(format!("Failed to serialize region: {}", e)))?;
        std::fs::write(path, json).map_err(|e| {
            ScanError::CaptureError(format!("Failed to write {}: {}", path.display(), e))
        })?;
        tracing::info!("Saved capture region {:?} to {}", self, path.display());
        Ok(())
    }

    /// Load a saved region; a missing file is `Ok(None)`
    pub fn load(path: &Path) -> Result<Option<Self>, ScanError> {
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path).map_err(|e| {
            ScanError::CaptureError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let region = serde_json::from_str(&json).map_err(|e| {
            ScanError::CaptureError(format!("Invalid region file {}: {}", path.display(), e))
        })?;
        Ok(Some(region))
    }
}

impl std::fmt::Display for CaptureRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.left, self.top)
    }
}

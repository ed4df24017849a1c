//! File-backed capture source
//!
//! Serves a screenshot from disk as if it were a live display. Used for
//! offline runs and layout verification; a host application plugs in a
//! real platform backend through the same trait.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::capture::{CaptureSource, CapturedFrame, DisplayInfo};

/// Capture source that re-reads one image file per capture call
pub struct StillImageCapture {
    path: PathBuf,
}

impl StillImageCapture {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CaptureSource for StillImageCapture {
    fn displays(&self) -> Result<Vec<DisplayInfo>> {
        if !self.path.exists() {
            anyhow::bail!("screenshot file {:?} does not exist", self.path);
        }
        Ok(vec![DisplayInfo { id: 0 }])
    }

    fn capture(&mut self, _display: DisplayInfo) -> Result<CapturedFrame> {
        let image = image::open(&self.path)
            .with_context(|| format!("failed to load screenshot {:?}", self.path))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        info!("Loaded screenshot {:?} ({}x{})", self.path, width, height);
        Ok(CapturedFrame::new(image.into_raw(), width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_fails_display_enumeration() {
        let capture = StillImageCapture::new(PathBuf::from("/nonexistent/shot.png"));
        assert!(capture.displays().is_err());
    }

    #[test]
    fn test_capture_round_trips_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        image::RgbaImage::from_pixel(48, 32, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let mut capture = StillImageCapture::new(path);
        let displays = capture.displays().unwrap();
        assert_eq!(displays, vec![DisplayInfo { id: 0 }]);

        let frame = capture.capture(displays[0]).unwrap();
        assert_eq!(frame.dimensions(), (48, 32));
        assert_eq!(frame.data.len(), 48 * 32 * 4);
    }
}

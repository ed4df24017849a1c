//! Captured frame handed from the capture seam into the pipeline

use std::time::{Duration, Instant};

/// One full-screen RGBA capture.
///
/// The frame remembers when it was grabbed so the solve cycle can report
/// how stale the pixels already were when recognition started — on a slow
/// capture backend the breach timer keeps running against old data.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Raw RGBA pixel data, row-major
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    captured_at: Instant,
}

impl CapturedFrame {
    /// Wrap freshly captured pixels
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            captured_at: Instant::now(),
        }
    }

    /// Frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Time elapsed since this frame was captured
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }
}

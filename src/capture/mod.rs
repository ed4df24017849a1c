//! Screen Capture Layer
//!
//! The actual capture backend is a collaborator supplied by the host
//! application. This module defines the seam the recognition pipeline
//! consumes: enumerate displays once at bootstrap, then grab full-screen
//! frames on demand.

pub mod frame;
pub mod still;

use anyhow::Result;

pub use frame::CapturedFrame;
pub use still::StillImageCapture;

/// A display available for capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInfo {
    /// Backend-specific display identifier
    pub id: u32,
}

/// Source of captured frames.
///
/// Implementations wrap a platform capture API. The pipeline calls
/// `displays` exactly once during bootstrap and `capture` once per solve
/// cycle; neither call is expected to be cheap.
pub trait CaptureSource: Send {
    /// Enumerate the displays available for capture
    fn displays(&self) -> Result<Vec<DisplayInfo>>;

    /// Capture one full frame of the given display
    fn capture(&mut self, display: DisplayInfo) -> Result<CapturedFrame>;
}

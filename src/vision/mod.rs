//! Vision/OCR Layer
//!
//! Turns captured frames into recognized puzzle fragments. Two
//! capability-equivalent recognizer backends are supported:
//! - a pooled in-process backend (leptess engines on worker threads),
//!   which returns per-word bounding boxes
//! - an external-process backend (the `tesseract` binary), which returns
//!   text only

pub mod external;
pub mod fragment;
pub mod image;
pub mod orchestrator;
pub mod pool;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::image::{ImageContainer, ProcessedFragment};
pub use external::ExternalTesseract;
pub use fragment::{BoundingBox, FragmentKind, FragmentLayout, RecognizedFragment, WordBox};
pub use orchestrator::FragmentOrchestrator;
pub use pool::OcrPool;

/// Characters the breach screen can contain; both backends whitelist these.
pub const HEX_WHITELIST: &str = "0123456789ABCDEF";

/// OCR backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackend {
    /// In-process worker pool (default; returns word boxes)
    #[default]
    Pooled,
    /// External `tesseract` binary (text only, no boxes)
    External,
}

/// Raw recognizer output for one fragment image
#[derive(Debug, Clone, Default)]
pub struct Recognized {
    /// Recognized text, as produced by the engine
    pub text: String,
    /// One box per recognized word, in processed-image pixel space.
    /// Empty for the external backend.
    pub boxes: Vec<WordBox>,
}

/// Converts a preprocessed fragment image into text plus word boxes
pub trait Recognizer: Send + Sync {
    /// Recognize an encoded (PNG) fragment image
    fn recognize(&self, image: &[u8]) -> Result<Recognized, RecognizeError>;
}

/// A single recognize call failed
#[derive(Debug, Error)]
pub enum RecognizeError {
    /// The input bytes were not a decodable image
    #[error("malformed fragment image: {0}")]
    BadImage(#[from] ::image::ImageError),

    /// The in-process engine rejected the job
    #[error("ocr engine error: {0}")]
    Engine(String),

    /// The external tesseract process failed
    #[error("tesseract process failed: {0}")]
    Process(String),

    /// The worker pool was shut down while the job was pending
    #[error("ocr worker pool is shut down")]
    PoolClosed,
}

/// Worker pool lifecycle misuse or failed initialization.
///
/// These are structural errors: the setup is wrong, and retrying the same
/// call will not help.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A pool is already live in this process
    #[error("ocr worker pool is already initialized")]
    AlreadyInitialized,

    /// A worker engine failed to load its language data
    #[error("failed to initialize ocr worker: {0}")]
    WorkerInit(String),
}

/// Recognition failed for one fragment; the solve cycle aborts on the first
/// such error rather than acting on partial data.
#[derive(Debug, Error)]
#[error("recognition failed for {kind} fragment: {source}")]
pub struct FragmentError {
    /// Which fragment failed
    pub kind: FragmentKind,
    #[source]
    pub source: RecognizeError,
}

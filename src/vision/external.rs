//! External-process recognizer backend
//!
//! Shells out to the `tesseract` binary with the custom breach-screen
//! language and the hex whitelist. Capability gap: this backend returns
//! text only; the box list is always empty. The pooled backend is the
//! default for box-dependent consumers.

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::vision::{Recognized, RecognizeError, Recognizer, HEX_WHITELIST};

/// Recognizer backed by the `tesseract` command-line binary
pub struct ExternalTesseract {
    tessdata_dir: PathBuf,
    language: String,
}

impl ExternalTesseract {
    /// Configure the backend. `tessdata_dir` must contain
    /// `<language>.traineddata`; nothing is validated until the first
    /// recognize call.
    pub fn new(tessdata_dir: PathBuf, language: impl Into<String>) -> Self {
        Self {
            tessdata_dir,
            language: language.into(),
        }
    }
}

impl Recognizer for ExternalTesseract {
    fn recognize(&self, image: &[u8]) -> Result<Recognized, RecognizeError> {
        // Reject malformed input up front so the caller gets a typed error
        // instead of a tesseract stderr dump.
        image::load_from_memory(image)?;

        let mut input = NamedTempFile::with_suffix(".png")
            .map_err(|e| RecognizeError::Process(format!("temp file: {e}")))?;
        input
            .write_all(image)
            .map_err(|e| RecognizeError::Process(format!("temp file: {e}")))?;

        let output = Command::new("tesseract")
            .arg(input.path())
            .arg("stdout")
            .arg("--tessdata-dir")
            .arg(&self.tessdata_dir)
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg("6") // single uniform block of text
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={HEX_WHITELIST}"))
            .arg("-c")
            .arg("page_separator=")
            .output()
            .map_err(|e| RecognizeError::Process(format!("failed to spawn tesseract: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognizeError::Process(stderr.trim().to_string()));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("External tesseract recognized {} bytes of text", text.len());

        Ok(Recognized { text, boxes: vec![] })
    }
}

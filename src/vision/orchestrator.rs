//! Fragment recognition orchestrator
//!
//! Glues the pieces together for one capture: look up each fragment's
//! bounding box, apply the matching transform, feed the result to the
//! active recognizer, and return typed fragments. A failure is tagged with
//! the fragment kind so the caller can abort the whole solve attempt
//! instead of acting on partial data.

use std::path::PathBuf;
use std::thread;
use tracing::{debug, warn};

use crate::vision::fragment::{FragmentKind, FragmentLayout, RecognizedFragment};
use crate::vision::image::ImageContainer;
use crate::vision::{FragmentError, Recognizer};

/// Drives fragment recognition for one capture resolution
pub struct FragmentOrchestrator<'a> {
    recognizer: &'a dyn Recognizer,
    layout: FragmentLayout,
    /// When set, every processed fragment is also written here as
    /// `<kind>.png` for troubleshooting.
    dump_dir: Option<PathBuf>,
}

impl<'a> FragmentOrchestrator<'a> {
    pub fn new(recognizer: &'a dyn Recognizer, layout: FragmentLayout) -> Self {
        Self {
            recognizer,
            layout,
            dump_dir: None,
        }
    }

    /// Enable dumping processed fragment images to `dir`
    pub fn with_dump_dir(mut self, dir: PathBuf) -> Self {
        self.dump_dir = Some(dir);
        self
    }

    /// Recognize one fragment of the capture.
    ///
    /// The returned `raw_data` is exactly the recognizer's output for this
    /// fragment; no cross-fragment concatenation happens here.
    pub fn recognize_fragment(
        &self,
        container: &ImageContainer,
        kind: FragmentKind,
    ) -> Result<RecognizedFragment, FragmentError> {
        let bbox = self.layout.bounding_box(kind);
        let processed = match kind {
            FragmentKind::Grid => container.process_grid_fragment(bbox),
            FragmentKind::Daemons => container.process_daemons_fragment(bbox),
            FragmentKind::BufferSize => container.process_buffer_size_fragment(bbox),
        };

        if let Some(dir) = &self.dump_dir {
            let path = dir.join(format!("{}.png", kind.name()));
            if let Err(e) = processed.save(&path) {
                warn!("Failed to dump {} fragment to {:?}: {}", kind.name(), path, e);
            }
        }

        let png = processed
            .to_png_buffer()
            .map_err(|e| FragmentError { kind, source: e.into() })?;
        let recognized = self
            .recognizer
            .recognize(&png)
            .map_err(|source| FragmentError { kind, source })?;

        debug!(
            "Recognized {} fragment: {} chars, {} boxes",
            kind.name(),
            recognized.text.len(),
            recognized.boxes.len()
        );

        Ok(RecognizedFragment {
            kind,
            raw_data: recognized.text,
            boxes: recognized.boxes,
        })
    }

    /// Recognize all fragments of the capture concurrently and wait for
    /// every one. Results come back in [`FragmentKind::ALL`] order; the
    /// first failure wins.
    pub fn recognize_all(
        &self,
        container: &ImageContainer,
    ) -> Result<Vec<RecognizedFragment>, FragmentError> {
        thread::scope(|scope| {
            let handles: Vec<_> = FragmentKind::ALL
                .iter()
                .map(|&kind| scope.spawn(move || self.recognize_fragment(container, kind)))
                .collect();

            let mut fragments = Vec::with_capacity(handles.len());
            let mut first_error = None;
            for handle in handles {
                match handle.join().expect("fragment recognition thread panicked") {
                    Ok(fragment) => fragments.push(fragment),
                    Err(e) => {
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(fragments),
            }
        })
    }
}

//! Solver Layer
//!
//! The solving algorithm itself is a collaborator supplied by the host
//! application; this module defines the seam it plugs into. The pipeline
//! guarantees the fragments handed over are complete for one capture —
//! a failed fragment aborts the cycle before this point.

use anyhow::Result;
use tracing::info;

use crate::vision::RecognizedFragment;

/// Everything recognized from one capture, in fragment order
#[derive(Debug, Clone)]
pub struct SolveInput {
    pub fragments: Vec<RecognizedFragment>,
}

/// Consumes recognized fragments and performs the actual solve
pub trait Solver: Send {
    /// Handle one complete set of recognized fragments
    fn solve(&mut self, input: SolveInput) -> Result<()>;
}

/// Placeholder solver that logs what was recognized. Useful for pipeline
/// bring-up and for verifying fragment layout against a real capture.
pub struct LoggingSolver;

impl Solver for LoggingSolver {
    fn solve(&mut self, input: SolveInput) -> Result<()> {
        for fragment in &input.fragments {
            info!(
                "{}: {:?} ({} boxes)",
                fragment.kind.name(),
                fragment.raw_data.trim(),
                fragment.boxes.len()
            );
        }
        Ok(())
    }
}

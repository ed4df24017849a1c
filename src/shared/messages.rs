//! Message types for communication between the controller and the worker
//! execution context

use crate::vision::FragmentKind;

/// Externally observable state of the worker execution context.
///
/// `Bootstrap -> Ready` happens exactly once; after that every solve cycle
/// is a strict `Ready -> Working -> Ready` round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    /// Initializing capture and the OCR backend
    Bootstrap,
    /// Idle, waiting for a solve request
    Ready,
    /// Running one capture/recognize/solve cycle
    Working,
}

/// Requests sent from the controller to the worker
#[derive(Debug, Clone)]
pub enum ControllerToWorker {
    /// Run one solve cycle
    Solve,
    /// Stop serving and tear down
    Shutdown,
}

/// Events sent from the worker back to the controller
#[derive(Debug, Clone)]
pub enum WorkerToController {
    /// Bootstrap finished; the worker accepts solve requests
    Ready,
    /// Emitted on every status transition
    Status(WorkerStatus),
    /// One solve cycle completed successfully
    Solved,
    /// One solve cycle failed; the worker is back at `Ready`.
    /// Distinct from `Fatal`: retrying with the next request is fine.
    SolveFailed {
        /// Which fragment failed, when the failure was a recognition error
        fragment: Option<FragmentKind>,
        message: String,
    },
    /// Structural failure (bootstrap, pool lifecycle); the worker is gone
    /// and the setup needs fixing before a restart.
    Fatal(String),
}

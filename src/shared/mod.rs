//! Shared messaging between the controller and the worker execution context
//!
//! The two sides communicate exclusively over channels; there is no shared
//! mutable state.

pub mod messages;

pub use messages::{ControllerToWorker, WorkerStatus, WorkerToController};

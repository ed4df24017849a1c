//! Worker Execution Context
//!
//! The long-lived loop that owns the recognition pipeline. It bootstraps
//! the capture subsystem and the OCR backend exactly once, then services
//! solve requests from the controller over channels, reporting every
//! status transition. Structural failures (bootstrap, pool lifecycle) are
//! fatal and reported as such; per-cycle failures return the context to
//! `Ready` for the next request.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::capture::{CaptureSource, DisplayInfo};
use crate::config::AppConfig;
use crate::shared::{ControllerToWorker, WorkerStatus, WorkerToController};
use crate::solver::{SolveInput, Solver};
use crate::vision::{
    FragmentKind, FragmentLayout, FragmentOrchestrator, ImageContainer, Recognizer,
};

/// Builds the recognizer during bootstrap, so structural initialization
/// errors (pool lifecycle, missing language data) surface as `Fatal`
/// events instead of panics in `new`.
pub type RecognizerFactory = Box<dyn FnOnce() -> Result<Box<dyn Recognizer>> + Send>;

/// One failed solve cycle
struct SolveFailure {
    fragment: Option<FragmentKind>,
    message: String,
}

/// The worker execution context. Construct it with its collaborators, move
/// it into a thread, and call [`WorkerContext::run`].
pub struct WorkerContext {
    config: AppConfig,
    capture: Box<dyn CaptureSource>,
    recognizer_factory: Option<RecognizerFactory>,
    solver: Box<dyn Solver>,
    requests: Receiver<ControllerToWorker>,
    events: Sender<WorkerToController>,
}

impl WorkerContext {
    pub fn new(
        config: AppConfig,
        capture: Box<dyn CaptureSource>,
        recognizer_factory: RecognizerFactory,
        solver: Box<dyn Solver>,
        requests: Receiver<ControllerToWorker>,
        events: Sender<WorkerToController>,
    ) -> Self {
        Self {
            config,
            capture,
            recognizer_factory: Some(recognizer_factory),
            solver,
            requests,
            events,
        }
    }

    /// Bootstrap once, then serve solve requests until shutdown
    pub fn run(mut self) {
        self.set_status(WorkerStatus::Bootstrap);

        let (display, recognizer) = match self.bootstrap() {
            Ok(bootstrapped) => bootstrapped,
            Err(e) => {
                error!("Worker bootstrap failed: {e:#}");
                let _ = self.events.send(WorkerToController::Fatal(format!("{e:#}")));
                return;
            }
        };

        self.set_status(WorkerStatus::Ready);
        let _ = self.events.send(WorkerToController::Ready);
        let display_id = display.id;
        info!("Worker ready on display {}", display_id);

        self.serve(display, recognizer.as_ref());
        info!("Worker shutting down");
    }

    fn bootstrap(&mut self) -> Result<(DisplayInfo, Box<dyn Recognizer>)> {
        let displays = self
            .capture
            .displays()
            .context("display enumeration failed")?;

        let display = match self.config.capture.display {
            Some(index) => *displays
                .get(index)
                .with_context(|| format!("configured display {index} not available"))?,
            None => *displays
                .first()
                .context("no display available for capture")?,
        };
        let display_id = display.id;
        debug!("Selected display {} of {}", display_id, displays.len());

        let factory = self
            .recognizer_factory
            .take()
            .context("worker context bootstrapped twice")?;
        let recognizer = factory().context("recognizer initialization failed")?;

        Ok((display, recognizer))
    }

    fn serve(&mut self, display: DisplayInfo, recognizer: &dyn Recognizer) {
        loop {
            match self.requests.recv() {
                Ok(ControllerToWorker::Solve) => {
                    self.set_status(WorkerStatus::Working);
                    let outcome = self.solve_cycle(display, recognizer);
                    self.set_status(WorkerStatus::Ready);

                    let event = match outcome {
                        Ok(()) => WorkerToController::Solved,
                        Err(failure) => {
                            warn!("Solve cycle failed: {}", failure.message);
                            WorkerToController::SolveFailed {
                                fragment: failure.fragment,
                                message: failure.message,
                            }
                        }
                    };
                    if self.events.send(event).is_err() {
                        return; // controller is gone
                    }

                    if self.drain_stale_requests() {
                        return;
                    }
                }
                Ok(ControllerToWorker::Shutdown) | Err(_) => return,
            }
        }
    }

    /// One full capture -> orchestrate -> recognize -> solve cycle
    fn solve_cycle(
        &mut self,
        display: DisplayInfo,
        recognizer: &dyn Recognizer,
    ) -> std::result::Result<(), SolveFailure> {
        let frame = self
            .capture
            .capture(display)
            .map_err(|e| SolveFailure {
                fragment: None,
                message: format!("capture failed: {e:#}"),
            })?;

        debug!(
            "Recognizing {}x{} capture ({:?} old)",
            frame.width,
            frame.height,
            frame.age()
        );

        let container = ImageContainer::from_frame(&frame, self.config.ocr.downscale)
            .map_err(|e| SolveFailure {
                fragment: None,
                message: format!("{e:#}"),
            })?;
        let layout = FragmentLayout::for_resolution(frame.width, frame.height);

        let mut orchestrator = FragmentOrchestrator::new(recognizer, layout);
        if let Some(dir) = self.fragment_dump_dir() {
            orchestrator = orchestrator.with_dump_dir(dir);
        }

        let fragments = orchestrator.recognize_all(&container).map_err(|e| SolveFailure {
            fragment: Some(e.kind),
            message: e.to_string(),
        })?;

        self.solver
            .solve(SolveInput { fragments })
            .map_err(|e| SolveFailure {
                fragment: None,
                message: format!("solver failed: {e:#}"),
            })
    }

    /// Solve requests that arrived while a cycle was running are ignored:
    /// the pool and capture subsystem serve one cycle at a time, and the
    /// controller decides when to send the next request. Shutdown is
    /// always honored. Returns true if the worker should stop.
    fn drain_stale_requests(&self) -> bool {
        while let Ok(request) = self.requests.try_recv() {
            match request {
                ControllerToWorker::Solve => {
                    warn!("Ignoring solve request received while working");
                }
                ControllerToWorker::Shutdown => return true,
            }
        }
        false
    }

    fn set_status(&self, status: WorkerStatus) {
        debug!("Worker status -> {:?}", status);
        let _ = self.events.send(WorkerToController::Status(status));
    }

    fn fragment_dump_dir(&self) -> Option<std::path::PathBuf> {
        if !self.config.debug.dump_fragments {
            return None;
        }
        let dir = match &self.config.debug.dump_dir {
            Some(dir) => dir.clone(),
            None => match crate::config::get_data_dir() {
                Ok(dir) => dir,
                Err(e) => {
                    warn!("Cannot resolve fragment dump directory: {e:#}");
                    return None;
                }
            },
        };
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("Cannot create fragment dump directory {:?}: {}", dir, e);
            return None;
        }
        Some(dir)
    }
}

//! BreachSolve - Breach Protocol autosolver recognition pipeline
//!
//! Captures the breach screen, recognizes its fragments (code grid, daemon
//! list, buffer size) via OCR, and hands the structured results to a
//! solver. This binary acts as the controller: it drives a background
//! worker execution context over channels and surfaces its status.

mod capture;
mod config;
mod shared;
mod solver;
mod vision;
mod worker;

use anyhow::{bail, Result};
use clap::Parser;
use crossbeam_channel::unbounded;
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::capture::StillImageCapture;
use crate::config::AppConfig;
use crate::shared::{ControllerToWorker, WorkerToController};
use crate::solver::LoggingSolver;
use crate::vision::{ExternalTesseract, OcrBackend, OcrPool, Recognizer};
use crate::worker::{RecognizerFactory, WorkerContext};

/// BreachSolve - Breach Protocol autosolver
#[derive(Parser, Debug)]
#[command(name = "breachsolve")]
#[command(about = "Recognizes Breach Protocol puzzle fragments from screen captures")]
struct Args {
    /// Screenshot file to solve from (stands in for live capture)
    #[arg(short, long)]
    screenshot: PathBuf,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// OCR backend override
    #[arg(long, value_enum)]
    backend: Option<OcrBackend>,

    /// Number of solve cycles to run
    #[arg(long, default_value = "1")]
    solves: u32,

    /// Display index override
    #[arg(long)]
    display: Option<usize>,

    /// Save processed fragment images for troubleshooting
    #[arg(long)]
    dump_fragments: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; --verbose only raises the default level
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("BreachSolve starting...");

    let mut config = load_or_create_config(args.config.as_deref());
    if let Some(backend) = args.backend {
        config.ocr.backend = backend;
    }
    if let Some(display) = args.display {
        config.capture.display = Some(display);
    }
    if args.dump_fragments {
        config.debug.dump_fragments = true;
    }

    let factory = recognizer_factory(&config);
    let capture = StillImageCapture::new(args.screenshot);

    let (request_tx, request_rx) = unbounded();
    let (event_tx, event_rx) = unbounded();

    let context = WorkerContext::new(
        config,
        Box::new(capture),
        factory,
        Box::new(LoggingSolver),
        request_rx,
        event_tx,
    );
    let handle = std::thread::spawn(move || context.run());

    // Controller loop: one request in flight at a time, next one only
    // after the worker reports the previous cycle finished.
    let mut completed = 0u32;
    let mut failed = 0u32;
    let mut fatal: Option<String> = None;

    while let Ok(event) = event_rx.recv() {
        match event {
            WorkerToController::Ready => {
                if args.solves == 0 {
                    let _ = request_tx.send(ControllerToWorker::Shutdown);
                    break;
                }
                info!("Worker ready, requesting first solve");
                request_tx.send(ControllerToWorker::Solve)?;
            }
            WorkerToController::Status(status) => {
                debug!("Worker status: {:?}", status);
            }
            WorkerToController::Solved => {
                completed += 1;
                info!("Solve cycle {} complete", completed + failed);
                if completed + failed >= args.solves {
                    let _ = request_tx.send(ControllerToWorker::Shutdown);
                    break;
                }
                request_tx.send(ControllerToWorker::Solve)?;
            }
            WorkerToController::SolveFailed { fragment, message } => {
                failed += 1;
                match fragment {
                    Some(kind) => error!("Solve attempt failed on {} fragment: {}", kind.name(), message),
                    None => error!("Solve attempt failed: {}", message),
                }
                if completed + failed >= args.solves {
                    let _ = request_tx.send(ControllerToWorker::Shutdown);
                    break;
                }
                request_tx.send(ControllerToWorker::Solve)?;
            }
            WorkerToController::Fatal(message) => {
                // Setup problem, not a bad solve attempt: fix config/restart
                fatal = Some(message);
                break;
            }
        }
    }

    drop(request_tx);
    let _ = handle.join();

    if let Some(message) = fatal {
        bail!("worker failed to start (configuration problem): {message}");
    }

    info!(
        "BreachSolve done: {} solved, {} failed of {} requested",
        completed, failed, args.solves
    );
    Ok(())
}

/// Load configuration from the given path, the platform config directory,
/// or fall back to defaults
fn load_or_create_config(path: Option<&std::path::Path>) -> AppConfig {
    if let Some(path) = path {
        match config::load_config(path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                return config;
            }
            Err(e) => {
                error!("Failed to load {:?}: {e:#}; using defaults", path);
                return AppConfig::default();
            }
        }
    }

    if let Ok(config_dir) = config::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return config;
            }
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

/// Build the recognizer factory for the configured backend. Runs inside
/// the worker's bootstrap so pool lifecycle errors surface as structural
/// failures there.
fn recognizer_factory(config: &AppConfig) -> RecognizerFactory {
    let tessdata = config.ocr.tessdata_dir.clone();
    let language = config.ocr.language.clone();
    match config.ocr.backend {
        OcrBackend::Pooled => {
            let workers = config.ocr.workers;
            Box::new(move || {
                let pool = OcrPool::init(&tessdata, &language, workers)?;
                Ok(Box::new(pool) as Box<dyn Recognizer>)
            })
        }
        OcrBackend::External => Box::new(move || {
            Ok(Box::new(ExternalTesseract::new(tessdata, language)) as Box<dyn Recognizer>)
        }),
    }
}

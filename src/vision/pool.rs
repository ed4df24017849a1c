//! OCR worker pool
//!
//! A fixed set of in-process tesseract engines, each owned by a dedicated
//! thread. Engines are expensive to initialize (language model load), so
//! they are created once at pool init and live until shutdown. Jobs go
//! through a shared channel; whichever worker is idle picks up the next
//! one, which gives pool-level load balancing for free. Each job completes
//! exactly once; no ordering is guaranteed between independent jobs.
//!
//! The pool is an owned handle rather than ambient global state, but the
//! original fail-fast lifecycle is kept: at most one pool may be live per
//! process, and a second `init` fails loudly while leaving the first pool
//! intact. A half-initialized pool never escapes `init`.

use crossbeam_channel::{Receiver, Sender};
use leptess::{LepTess, Variable};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::vision::fragment::WordBox;
use crate::vision::{PoolError, Recognized, RecognizeError, Recognizer, HEX_WHITELIST};

/// At most one live pool per process; the engines bind native resources
/// that must not be duplicated by accident.
static POOL_LIVE: AtomicBool = AtomicBool::new(false);

/// One queued recognize job
struct Job {
    image: Vec<u8>,
    reply: Sender<Result<Recognized, RecognizeError>>,
}

/// Owned handle to the worker pool. Dropping (or calling `shutdown`) joins
/// the workers, releases the engines, and allows a future `init`.
pub struct OcrPool {
    jobs: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl OcrPool {
    /// Default pool size; two engines keep one solve cycle's three
    /// fragments moving without idling a core per fragment.
    pub const DEFAULT_WORKERS: usize = 2;

    /// Initialize the pool: spawn `worker_count` threads, each loading the
    /// `language` model from `tessdata_dir` and applying the hex whitelist.
    /// Returns only after every engine is loaded and accepting jobs.
    ///
    /// Fails with [`PoolError::AlreadyInitialized`] if a pool is live —
    /// double initialization is a programming error, not a retry case.
    pub fn init(
        tessdata_dir: &Path,
        language: &str,
        worker_count: usize,
    ) -> Result<Self, PoolError> {
        if POOL_LIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PoolError::AlreadyInitialized);
        }

        let worker_count = worker_count.max(1);
        info!(
            "Initializing OCR pool: {} workers, language '{}', tessdata {:?}",
            worker_count, language, tessdata_dir
        );

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), PoolError>>(worker_count);
        let tessdata = tessdata_dir.to_string_lossy().into_owned();

        let mut workers = Vec::with_capacity(worker_count);
        let mut failure: Option<PoolError> = None;

        for worker_id in 0..worker_count {
            let job_rx = job_rx.clone();
            let ready_tx = ready_tx.clone();
            let tessdata = tessdata.clone();
            let language = language.to_string();

            let spawned = thread::Builder::new()
                .name(format!("ocr-worker-{worker_id}"))
                .spawn(move || {
                    let mut engine = match init_engine(&tessdata, &language) {
                        Ok(engine) => {
                            let _ = ready_tx.send(Ok(()));
                            engine
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    drop(ready_tx);
                    run_worker(worker_id, &mut engine, job_rx);
                });

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    failure = Some(PoolError::WorkerInit(format!("thread spawn: {e}")));
                    break;
                }
            }
        }
        drop(ready_tx);

        // Every engine must come up before the pool accepts jobs.
        if failure.is_none() {
            for _ in 0..workers.len() {
                match ready_rx.recv() {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        failure = Some(e);
                        break;
                    }
                    Err(_) => {
                        failure = Some(PoolError::WorkerInit(
                            "worker exited during startup".to_string(),
                        ));
                        break;
                    }
                }
            }
        }

        if let Some(e) = failure {
            drop(job_tx);
            for handle in workers {
                let _ = handle.join();
            }
            POOL_LIVE.store(false, Ordering::SeqCst);
            return Err(e);
        }

        info!("OCR pool ready");
        Ok(Self {
            jobs: Some(job_tx),
            workers,
        })
    }

    /// Number of live workers
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Tear down the pool: close the queue, join the workers, release the
    /// process-wide slot. Pending jobs complete before their worker exits.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        let Some(jobs) = self.jobs.take() else {
            return;
        };
        drop(jobs);
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        POOL_LIVE.store(false, Ordering::SeqCst);
        info!("OCR pool shut down");
    }
}

impl Drop for OcrPool {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

impl Recognizer for OcrPool {
    fn recognize(&self, image: &[u8]) -> Result<Recognized, RecognizeError> {
        let jobs = self.jobs.as_ref().ok_or(RecognizeError::PoolClosed)?;
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        jobs.send(Job {
            image: image.to_vec(),
            reply: reply_tx,
        })
        .map_err(|_| RecognizeError::PoolClosed)?;
        reply_rx.recv().map_err(|_| RecognizeError::PoolClosed)?
    }
}

/// Load and parameterize one engine. Runs on the worker's own thread since
/// `LepTess` is not shareable across threads.
fn init_engine(tessdata: &str, language: &str) -> Result<LepTess, PoolError> {
    let mut engine = LepTess::new(Some(tessdata), language)
        .map_err(|e| PoolError::WorkerInit(e.to_string()))?;
    engine
        .set_variable(Variable::TesseditCharWhitelist, HEX_WHITELIST)
        .map_err(|e| PoolError::WorkerInit(e.to_string()))?;
    engine
        .set_variable(Variable::TesseditPagesegMode, "6")
        .map_err(|e| PoolError::WorkerInit(e.to_string()))?;
    Ok(engine)
}

fn run_worker(worker_id: usize, engine: &mut LepTess, jobs: Receiver<Job>) {
    debug!("ocr-worker-{worker_id} started");
    while let Ok(job) = jobs.recv() {
        let result = recognize_with(engine, &job.image);
        if let Err(e) = &result {
            warn!("ocr-worker-{worker_id} job failed: {e}");
        }
        // The submitter may have given up waiting; nothing to do then.
        let _ = job.reply.send(result);
    }
    debug!("ocr-worker-{worker_id} exiting");
}

fn recognize_with(engine: &mut LepTess, image: &[u8]) -> Result<Recognized, RecognizeError> {
    engine
        .set_image_from_mem(image)
        .map_err(|e| RecognizeError::Engine(format!("set image: {e}")))?;
    let text = engine
        .get_utf8_text()
        .map_err(|e| RecognizeError::Engine(format!("get text: {e}")))?;
    let tsv = engine
        .get_tsv_text(0)
        .map_err(|e| RecognizeError::Engine(format!("get tsv: {e}")))?;
    Ok(Recognized {
        text,
        boxes: parse_word_boxes(&tsv),
    })
}

/// Extract word boxes from tesseract TSV output.
///
/// Columns: level, page, block, par, line, word, left, top, width, height,
/// conf, text. Level 5 rows are words; rows with empty text are layout
/// artifacts and are skipped.
fn parse_word_boxes(tsv: &str) -> Vec<WordBox> {
    let mut boxes = Vec::new();
    for line in tsv.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }
        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 || fields[11].trim().is_empty() {
            continue;
        }
        let left: i32 = fields[6].parse().unwrap_or(0);
        let top: i32 = fields[7].parse().unwrap_or(0);
        let width: i32 = fields[8].parse().unwrap_or(0);
        let height: i32 = fields[9].parse().unwrap_or(0);
        boxes.push(WordBox {
            x0: left,
            y0: top,
            x1: left + width,
            y1: top + height,
        });
    }
    boxes
}

//! # Worker Pool Module
//!
//! Pool a dimensione fissa di worker tokio che consumano una coda di path.
//!
//! ## Ciclo di vita:
//! 1. `submit_jobs()`: crea coda job e coda risultati, entrambe dimensionate
//!    sul numero di job (minimo 1), e accoda tutti i path
//! 2. `start()`: avvia esattamente N worker, ognuno nel proprio span `worker`
//! 3. `wait()`: chiude la coda job, attende tutti i worker e svuota i risultati
//! 4. `stop()`: cancella il token, i worker in attesa escono subito
//!
//! La coda job viene chiusa una volta sola: il sender vive in un `Option` e
//! viene rilasciato in `wait()`. Il pool non interpreta gli errori dei file,
//! si limita a raccogliere i `ProcessResult`.

use crate::config::Config;
use crate::platform::ToolPaths;
use crate::probe::{FfprobeProber, MediaProber};
use crate::processor::worker::{JobReceiver, Worker};
use crate::processor::ProcessResult;
use crate::progress::ProgressTracker;
use crate::transcoder::{FfmpegTranscoder, Transcoder};
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument};

/// External tools shared by every worker
#[derive(Clone)]
pub struct Toolchain {
    pub prober: Arc<dyn MediaProber>,
    pub transcoder: Arc<dyn Transcoder>,
    pub probe_timeout: Duration,
    pub validate_timeout: Duration,
}

impl Toolchain {
    pub fn new(
        prober: Arc<dyn MediaProber>,
        transcoder: Arc<dyn Transcoder>,
        probe_timeout: Duration,
        validate_timeout: Duration,
    ) -> Self {
        Self {
            prober,
            transcoder,
            probe_timeout,
            validate_timeout,
        }
    }

    /// ffprobe/ffmpeg reali, ai path già risolti
    pub fn from_tools(tools: &ToolPaths, config: &Config) -> Self {
        Self::new(
            Arc::new(FfprobeProber::new(tools.ffprobe.to_string_lossy())),
            Arc::new(FfmpegTranscoder::new(tools.ffmpeg.to_string_lossy())),
            config.probe_timeout(),
            config.validate_timeout(),
        )
    }
}

pub struct Pool {
    workers: usize,
    attempt: u32,
    toolchain: Toolchain,
    token: CancellationToken,
    job_tx: Option<mpsc::Sender<PathBuf>>,
    job_rx: Option<JobReceiver>,
    result_tx: Option<mpsc::Sender<ProcessResult>>,
    result_rx: Option<mpsc::Receiver<ProcessResult>>,
    handles: Vec<JoinHandle<()>>,
}

impl Pool {
    pub fn new(workers: usize, toolchain: Toolchain, token: CancellationToken) -> Self {
        Self {
            workers: workers.max(1),
            attempt: 0,
            toolchain,
            token,
            job_tx: None,
            job_rx: None,
            result_tx: None,
            result_rx: None,
            handles: Vec::new(),
        }
    }

    /// Tag results produced by this pool with the retry attempt index
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    /// Queue every path. Returns how many jobs were queued.
    pub fn submit_jobs(&mut self, paths: Vec<PathBuf>) -> usize {
        let capacity = paths.len().max(1);
        let (job_tx, job_rx) = mpsc::channel(capacity);
        let (result_tx, result_rx) = mpsc::channel(capacity);

        let mut queued = 0;
        for path in paths {
            match job_tx.try_send(path) {
                Ok(()) => queued += 1,
                Err(e) => warn!("Could not queue job: {}", e),
            }
        }
        debug!("Queued {} jobs", queued);

        self.job_tx = Some(job_tx);
        self.job_rx = Some(Arc::new(Mutex::new(job_rx)));
        self.result_tx = Some(result_tx);
        self.result_rx = Some(result_rx);
        queued
    }

    /// Spawn the workers. Jobs must have been submitted first.
    pub fn start(&mut self, tracker: ProgressTracker) {
        let (Some(jobs), Some(results)) = (self.job_rx.take(), self.result_tx.take()) else {
            warn!("Pool started without submitted jobs");
            return;
        };

        for id in 0..self.workers {
            let worker = Worker::new(id, self.attempt, self.toolchain.clone());
            let handle = tokio::spawn(
                worker
                    .run(jobs.clone(), results.clone(), self.token.child_token(), tracker.clone())
                    .instrument(info_span!("worker", id)),
            );
            self.handles.push(handle);
        }
        debug!("Started {} workers", self.workers);
    }

    /// Close the job queue, join every worker and collect all results.
    ///
    /// L'ordine dei risultati è quello di arrivo, non quello di input.
    pub async fn wait(&mut self) -> Vec<ProcessResult> {
        drop(self.job_tx.take());

        for joined in join_all(self.handles.drain(..)).await {
            if let Err(e) = joined {
                error!("Worker task failed: {}", e);
            }
        }

        // pool mai avviato: nessun worker possiede il sender
        drop(self.result_tx.take());

        let mut results = Vec::new();
        if let Some(mut result_rx) = self.result_rx.take() {
            result_rx.close();
            while let Some(result) = result_rx.recv().await {
                results.push(result);
            }
        }
        results
    }

    /// Cancel the pool; idle workers exit without draining the queue.
    pub fn stop(&self) {
        self.token.cancel();
    }
}

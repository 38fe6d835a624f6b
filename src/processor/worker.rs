//! # Worker Module
//!
//! Un worker preleva path dalla coda condivisa e porta ogni file attraverso
//! l'intera pipeline, producendo esattamente un `ProcessResult` per job.
//!
//! ## Pipeline per file:
//! 1. **Resolve**: il file esiste, il sidecar `.nfo` esiste
//! 2. **Parse**: XML del sidecar → `EpisodeDetails`
//! 3. **Translate**: `EpisodeDetails` → `Metadata` → tag
//! 4. **Compare**: tag già presenti nel container? Allora `Skipped`, nessuna modifica
//!    (a parte la rimozione di un backup rimasto da un commit precedente)
//! 5. **Backup/Process/Validate/Cleanup**: transazione dell'`Executor`
//!
//! ## Cancellazione:
//! L'attesa di un nuovo job è in `select!` con il token: un worker inattivo
//! esce subito. Un job già prelevato arriva sempre fino in fondo.

use crate::error::{ExecutorError, PipelineError};
use crate::executor::Executor;
use crate::file_manager::FileManager;
use crate::metadata::{tags_match, translate};
use crate::nfo::{locate_sidecar, parse_sidecar};
use crate::processor::pool::Toolchain;
use crate::processor::{ProcessResult, ProcessStatus};
use crate::progress::{ProgressTracker, Stage};
use crate::transcoder::TranscodeCommand;
use crate::validator::Validator;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub type JobReceiver = Arc<Mutex<mpsc::Receiver<PathBuf>>>;

pub struct Worker {
    id: usize,
    attempt: u32,
    toolchain: Toolchain,
    executor: Executor,
}

impl Worker {
    pub fn new(id: usize, attempt: u32, toolchain: Toolchain) -> Self {
        let validator = Validator::new(toolchain.prober.clone(), toolchain.validate_timeout);
        let executor = Executor::new(toolchain.transcoder.clone(), validator);

        Self {
            id,
            attempt,
            toolchain,
            executor,
        }
    }

    /// Pull jobs until the queue is closed and drained, or `token` is cancelled.
    pub async fn run(
        self,
        jobs: JobReceiver,
        results: mpsc::Sender<ProcessResult>,
        token: CancellationToken,
        tracker: ProgressTracker,
    ) {
        debug!("Worker {} started", self.id);

        loop {
            let job = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("Worker {} cancelled", self.id);
                    break;
                }
                job = async { jobs.lock().await.recv().await } => job,
            };

            let Some(path) = job else {
                break;
            };

            let result = self.process(&path, &tracker).await;
            tracker.complete_file(&path);

            if results.send(result).await.is_err() {
                warn!("Result queue closed, worker {} stopping", self.id);
                break;
            }
        }

        debug!("Worker {} finished", self.id);
    }

    /// Run the pipeline for one file; never fails, errors become the result.
    pub async fn process(&self, path: &Path, tracker: &ProgressTracker) -> ProcessResult {
        let outcome = AssertUnwindSafe(self.run_pipeline(path, tracker))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(status)) => ProcessResult::success(path.to_path_buf(), status, self.attempt),
            Ok(Err(err)) => {
                let result = ProcessResult::from_error(path.to_path_buf(), err, self.attempt);
                warn!(
                    "{} failed ({}): {}",
                    path.display(),
                    result.status,
                    result.error.as_deref().unwrap_or_default()
                );
                result
            }
            Err(panic) => {
                let err = PipelineError::Unknown(panic_message(panic));
                ProcessResult::from_error(path.to_path_buf(), err, self.attempt)
            }
        }
    }

    async fn run_pipeline(&self, path: &Path, tracker: &ProgressTracker) -> Result<ProcessStatus, PipelineError> {
        tracker.update_stage(path, Stage::Resolve);
        tokio::fs::metadata(path)
            .await
            .map_err(|source| PipelineError::FileNotFound {
                path: path.to_path_buf(),
                source,
            })?;
        let nfo_path = locate_sidecar(path).map_err(PipelineError::SidecarNotFound)?;

        tracker.update_stage(path, Stage::Parse);
        let details = parse_sidecar(&nfo_path).await.map_err(PipelineError::Parse)?;

        tracker.update_stage(path, Stage::Translate);
        let metadata = translate(Some(&details)).map_err(PipelineError::Translation)?;
        let tags = metadata.to_tags();

        tracker.update_stage(path, Stage::Compare);
        let existing = match self.toolchain.prober.probe(path, self.toolchain.probe_timeout).await {
            Ok(probe) => probe.tags().clone(),
            Err(e) => {
                warn!("Could not read existing tags of {}: {}", path.display(), e);
                HashMap::new()
            }
        };
        if tags_match(&existing, &tags) {
            info!("Metadata already up to date: {}", path.display());
            remove_stale_backup(path).await?;
            return Ok(ProcessStatus::Skipped);
        }

        let command = TranscodeCommand::new(path, &FileManager::output_path(path), tags);
        self.executor.execute(&command, tracker).await?;

        Ok(ProcessStatus::Success)
    }
}

/// Un file già aggiornato non ha più bisogno del backup di un commit precedente.
async fn remove_stale_backup(path: &Path) -> Result<(), PipelineError> {
    let backup = FileManager::backup_path(path);
    if tokio::fs::metadata(&backup).await.is_err() {
        return Ok(());
    }

    warn!("Removing leftover backup {}", backup.display());
    FileManager::remove_if_exists(&backup)
        .await
        .map_err(|source| ExecutorError::RemoveBackup { path: backup, source })?;
    Ok(())
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("worker panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("worker panicked: {}", message)
    } else {
        "worker panicked".to_string()
    }
}

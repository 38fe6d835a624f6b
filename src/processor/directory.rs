//! # Directory Processor Module
//!
//! Orchestratore principale: discovery dei video e loop di retry.
//!
//! ## Flusso di esecuzione:
//! 1. **Discovery**: tutti i video supportati sotto la directory, una volta sola
//! 2. **Tentativo**: pool e tracker nuovi, dimensionati sul working set corrente
//! 3. **Partizione**: i successi sono definitivi, i falliti formano il prossimo working set
//! 4. **Fine**: budget esaurito o run cancellato, i falliti correnti diventano definitivi
//!
//! Il tentativo k+1 contiene solo i file falliti al tentativo k; nessun file
//! viene perso, ognuno ha esattamente un risultato definitivo (salvo i job
//! mai prelevati di un run cancellato).

use crate::config::Config;
use crate::file_manager::FileManager;
use crate::processor::pool::{Pool, Toolchain};
use crate::processor::ProcessResult;
use crate::progress::ProgressTracker;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Tentativi extra massimi, qualunque sia la configurazione
pub const MAX_RETRIES: u32 = 5;

pub struct Processor {
    config: Config,
    toolchain: Toolchain,
    token: CancellationToken,
}

impl Processor {
    pub fn new(config: &Config, toolchain: Toolchain) -> Self {
        Self {
            config: config.normalized(),
            toolchain,
            token: CancellationToken::new(),
        }
    }

    /// Token that cancels the whole run, including the pool in flight
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Discover every video under `media_dir` and process it.
    pub async fn process_directory(&self, media_dir: &Path) -> Result<Vec<ProcessResult>> {
        let spinner = self
            .config
            .show_progress
            .then(|| ProgressTracker::spinner("Discovering video files..."));

        let discovery_dir = media_dir.to_path_buf();
        let discovered = tokio::task::spawn_blocking(move || FileManager::find_media_files(&discovery_dir))
            .await
            .context("Discovery task failed")?;

        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        let files = discovered.with_context(|| format!("Failed to scan {}", media_dir.display()))?;

        info!("Found {} video files in {}", files.len(), media_dir.display());
        Ok(self.process_files(files).await)
    }

    /// Run the retry loop over `files`.
    pub async fn process_files(&self, files: Vec<PathBuf>) -> Vec<ProcessResult> {
        let mut remaining = self.config.retries.min(MAX_RETRIES) + 1;
        let mut attempt = 0;
        let mut working = files;
        let mut terminal = Vec::with_capacity(working.len());

        while !working.is_empty() {
            let total = working.len();
            info!("Attempt {}: processing {} files", attempt + 1, total);

            let tracker = if self.config.show_progress {
                ProgressTracker::new(total)
            } else {
                ProgressTracker::hidden(total)
            };

            let mut pool = Pool::new(self.config.workers, self.toolchain.clone(), self.token.child_token())
                .with_attempt(attempt);
            pool.submit_jobs(working);
            pool.start(tracker.clone());
            let results = pool.wait().await;
            tracker.finish(&tracker.description());

            let (succeeded, failed): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.success);
            debug!("Attempt {}: {} succeeded, {} failed", attempt + 1, succeeded.len(), failed.len());
            terminal.extend(succeeded);
            remaining -= 1;

            if failed.is_empty() {
                break;
            }
            if remaining == 0 || self.token.is_cancelled() {
                if self.token.is_cancelled() {
                    warn!("Run cancelled, {} failed files will not be retried", failed.len());
                }
                terminal.extend(failed);
                break;
            }

            info!("{} files failed, retrying ({} attempts left)", failed.len(), remaining);
            working = failed.into_iter().map(|r| r.file_path).collect();
            attempt += 1;
        }

        terminal
    }
}

//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking condiviso tra i worker e il
//! riepilogo finale del run.
//!
//! ## Responsabilità:
//! - `ProgressTracker`: stage corrente di ogni file attivo + contatore completati
//! - Progress bar `indicatif` aggiornata ad ogni cambio di stato
//! - `RunSummary`: statistiche aggregate sui risultati terminali
//!
//! ## Concorrenza:
//! Un solo mutex protegge mappa degli stage e contatori. La descrizione viene
//! ricalcolata dentro il lock, quindi non mostra mai uno stato intermedio.
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] [=====>----------] 4/12 (33%) 4/12 complete
//! s01e05.mkv: Process
//! s01e06.mkv: Validate
//! s01e07.mkv: Parse (+ 2 more)
//! ```

use crate::processor::{ProcessResult, ProcessStatus};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Numero massimo di file attivi mostrati nella descrizione
const MAX_VISIBLE_FILES: usize = 3;

/// Pipeline stage a file is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Parse,
    Translate,
    Compare,
    Backup,
    Process,
    Validate,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolve => "Resolve",
            Stage::Parse => "Parse",
            Stage::Translate => "Translate",
            Stage::Compare => "Compare",
            Stage::Backup => "Backup",
            Stage::Process => "Process",
            Stage::Validate => "Validate",
            Stage::Cleanup => "Cleanup",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    total: usize,
    completed: usize,
    active: BTreeMap<PathBuf, Stage>,
}

impl TrackerState {
    fn describe(&self) -> String {
        let mut description = format!("{}/{} complete", self.completed, self.total);

        for (path, stage) in self.active.iter().take(MAX_VISIBLE_FILES) {
            let name = path.file_name().unwrap_or(path.as_os_str()).to_string_lossy();
            description.push_str(&format!("\n{}: {}", name, stage));
        }
        if self.active.len() > MAX_VISIBLE_FILES {
            description.push_str(&format!(" (+ {} more)", self.active.len() - MAX_VISIBLE_FILES));
        }

        description
    }
}

/// Thread-safe per-file progress shared by all workers of a pool
#[derive(Clone)]
pub struct ProgressTracker {
    state: Arc<Mutex<TrackerState>>,
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Create a tracker with a visible progress bar
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);

        // il template è una costante valida
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self::with_bar(total, bar)
    }

    /// Tracker senza output a terminale (test, `--no-progress`)
    pub fn hidden(total: usize) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total as u64);
        Self::with_bar(total, bar)
    }

    fn with_bar(total: usize, bar: ProgressBar) -> Self {
        let state = TrackerState {
            total,
            ..Default::default()
        };
        bar.set_message(state.describe());

        Self {
            state: Arc::new(Mutex::new(state)),
            bar,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that `path` entered `stage`.
    pub fn update_stage(&self, path: &Path, stage: Stage) {
        let mut state = self.lock();
        state.active.insert(path.to_path_buf(), stage);
        self.bar.set_message(state.describe());
    }

    /// Mark `path` as done. Unknown paths still count toward completion.
    pub fn complete_file(&self, path: &Path) {
        let mut state = self.lock();
        state.active.remove(path);
        state.completed += 1;
        self.bar.set_position(state.completed as u64);
        self.bar.set_message(state.describe());
    }

    pub fn description(&self) -> String {
        self.lock().describe()
    }

    pub fn completed(&self) -> usize {
        self.lock().completed
    }

    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }

    pub fn stage_of(&self, path: &Path) -> Option<Stage> {
        self.lock().active.get(path).copied()
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();

        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }

        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }
}

/// Statistics over the terminal results of a run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub files_processed: usize,
    pub files_updated: usize,
    pub files_skipped: usize,
    pub files_retried: usize,
    pub errors: usize,
}

impl RunSummary {
    pub fn from_results(results: &[ProcessResult]) -> Self {
        let mut summary = Self::default();

        for result in results {
            summary.files_processed += 1;
            match result.status {
                ProcessStatus::Success => summary.files_updated += 1,
                ProcessStatus::Skipped => summary.files_skipped += 1,
                _ => summary.errors += 1,
            }
            if result.retries > 0 {
                summary.files_retried += 1;
            }
        }

        summary
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Updated: {} | Skipped: {} | Errors: {} | Needed retry: {}",
            self.files_processed, self.files_updated, self.files_skipped, self.errors, self.files_retried
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_limits_visible_files() {
        let tracker = ProgressTracker::hidden(10);
        assert_eq!(tracker.description(), "0/10 complete");

        for (i, stage) in [Stage::Resolve, Stage::Parse, Stage::Backup, Stage::Process, Stage::Validate]
            .into_iter()
            .enumerate()
        {
            tracker.update_stage(Path::new(&format!("/media/ep{}.mkv", i)), stage);
        }

        assert_eq!(
            tracker.description(),
            "0/10 complete\nep0.mkv: Resolve\nep1.mkv: Parse\nep2.mkv: Backup (+ 2 more)"
        );
    }

    #[test]
    fn test_complete_removes_entry() {
        let tracker = ProgressTracker::hidden(2);
        let path = Path::new("/media/ep1.mkv");

        tracker.update_stage(path, Stage::Parse);
        tracker.update_stage(path, Stage::Validate);
        assert_eq!(tracker.stage_of(path), Some(Stage::Validate));
        assert_eq!(tracker.active_count(), 1);

        tracker.complete_file(path);
        assert_eq!(tracker.active_count(), 0);
        assert_eq!(tracker.completed(), 1);

        // path mai visto: conta comunque
        tracker.complete_file(Path::new("/media/unknown.mkv"));
        assert_eq!(tracker.completed(), 2);
        assert_eq!(tracker.description(), "2/2 complete");
    }

    #[test]
    fn test_concurrent_updates() {
        let tracker = ProgressTracker::hidden(64);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    for i in 0..8 {
                        let path = PathBuf::from(format!("/media/t{}-{}.mkv", t, i));
                        tracker.update_stage(&path, Stage::Resolve);
                        tracker.update_stage(&path, Stage::Process);
                        tracker.complete_file(&path);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.completed(), 64);
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn test_run_summary() {
        let results = vec![
            ProcessResult::success(PathBuf::from("a.mkv"), ProcessStatus::Success, 0),
            ProcessResult::success(PathBuf::from("b.mkv"), ProcessStatus::Skipped, 0),
            ProcessResult::success(PathBuf::from("c.mkv"), ProcessStatus::Success, 2),
            ProcessResult::failure(
                PathBuf::from("d.mkv"),
                ProcessStatus::SidecarNotFound,
                "NFO file not found".to_string(),
                1,
            ),
        ];

        let summary = RunSummary::from_results(&results);
        assert_eq!(summary.files_processed, 4);
        assert_eq!(summary.files_updated, 2);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.files_retried, 2);
        assert_eq!(
            summary.format_summary(),
            "Processed: 4 files | Updated: 2 | Skipped: 1 | Errors: 1 | Needed retry: 2"
        );
    }
}

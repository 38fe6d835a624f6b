//! # Report Output Module
//!
//! Questo modulo scrive i risultati definitivi di un run come JSON.
//!
//! ## Responsabilità:
//! - `save_results()`: tutti i risultati, array JSON indentato
//! - `save_failures()`: solo i risultati con `success == false`
//! - `status_counts()`: conteggio per status, usato nel riepilogo finale
//!
//! ## Formato:
//! ```text
//! [
//!   {
//!     "file_path": "/media/show/s01e03.mkv",
//!     "status": "SidecarNotFound",
//!     "success": false,
//!     "error": "NFO file not found: /media/show/s01e03.nfo does not exist",
//!     "retries": 2
//!   }
//! ]
//! ```

use crate::processor::{ProcessResult, ProcessStatus};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Write every result to `path`
pub async fn save_results(path: &Path, results: &[ProcessResult]) -> Result<()> {
    write_json(path, results).await?;
    info!("Saved {} results to {}", results.len(), path.display());
    Ok(())
}

/// Write only the failed results to `path`
pub async fn save_failures(path: &Path, results: &[ProcessResult]) -> Result<()> {
    let failures: Vec<&ProcessResult> = results.iter().filter(|r| !r.success).collect();
    write_json(path, &failures).await?;
    info!("Saved {} failures to {}", failures.len(), path.display());
    Ok(())
}

async fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).context("Failed to serialize results")?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

pub fn status_counts(results: &[ProcessResult]) -> BTreeMap<ProcessStatus, usize> {
    let mut counts = BTreeMap::new();
    for result in results {
        *counts.entry(result.status).or_insert(0) += 1;
    }
    counts
}

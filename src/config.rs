//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config`, costruita una sola volta e passata esplicitamente
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Normalizza worker e retry nei limiti supportati
//!
//! ## Parametri di configurazione:
//! - `workers`: Numero di worker paralleli (default: 4, max: core disponibili)
//! - `retries`: Tentativi extra per i file falliti (default: 2, max: 5)
//! - `probe_timeout_secs`: Timeout di ffprobe nel confronto tag (default: 30)
//! - `validate_timeout_secs`: Timeout di ffprobe nella validazione (default: 60)
//! - `ffmpeg_path` / `ffprobe_path`: Path espliciti dei tool (default: ricerca nel PATH)
//! - `show_progress`: Progress bar a terminale (default: true)
//! - `results_file` / `failures_file`: Report JSON opzionali
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     workers: 8,
//!     retries: 3,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::processor::MAX_RETRIES;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a metadata update run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of parallel workers
    pub workers: usize,
    /// Extra attempts for failed files
    pub retries: u32,
    /// ffprobe timeout when reading existing tags
    pub probe_timeout_secs: u64,
    /// ffprobe timeout when validating the rewritten file
    pub validate_timeout_secs: u64,
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub show_progress: bool,
    /// Write every terminal result here (pretty JSON)
    pub results_file: Option<PathBuf>,
    /// Write only the failed results here (pretty JSON)
    pub failures_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 4,
            retries: 2,
            probe_timeout_secs: 30,
            validate_timeout_secs: 60,
            ffmpeg_path: None,
            ffprobe_path: None,
            show_progress: true,
            results_file: None,
            failures_file: None,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.probe_timeout_secs == 0 || self.validate_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Probe timeouts must be greater than 0 seconds"));
        }

        for tool in [&self.ffmpeg_path, &self.ffprobe_path].into_iter().flatten() {
            if !tool.is_file() {
                return Err(anyhow::anyhow!("Tool path is not a file: {}", tool.display()));
            }
        }

        Ok(())
    }

    /// Copy with `workers` in `[1, available cores]` and `retries` capped at [`MAX_RETRIES`].
    pub fn normalized(&self) -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            workers: self.workers.clamp(1, cores),
            retries: self.retries.min(MAX_RETRIES),
            ..self.clone()
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn validate_timeout(&self) -> Duration {
        Duration::from_secs(self.validate_timeout_secs)
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.workers = 0;
        assert!(config.validate().is_err());

        config.workers = 4;
        config.validate_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.validate_timeout_secs = 60;
        config.ffmpeg_path = Some(PathBuf::from("/path/to/nonexistent/ffmpeg"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.retries, 2);
        assert_eq!(config.probe_timeout(), Duration::from_secs(30));
        assert!(config.show_progress);
        assert!(config.results_file.is_none());
    }

    #[test]
    fn test_config_normalized() {
        let cores = std::thread::available_parallelism().unwrap().get();

        let config = Config {
            workers: 10_000,
            retries: 99,
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.workers, cores);
        assert_eq!(config.retries, MAX_RETRIES);

        let config = Config {
            workers: 0,
            retries: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.workers, 1);
        assert_eq!(config.retries, 0);
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original_config = Config {
            workers: 2,
            retries: 4,
            show_progress: false,
            results_file: Some(temp_dir.path().join("results.json")),
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();
        assert_eq!(loaded_config, original_config);
    }

    #[tokio::test]
    async fn test_config_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        std::fs::write(&config_path, r#"{ "workers": 1 }"#).unwrap();

        let config = Config::from_file(&config_path).await.unwrap();
        assert_eq!(config.workers, 1);
        assert_eq!(config.retries, 2);

        let missing = Config::from_file(&temp_dir.path().join("missing.json")).await.unwrap();
        assert_eq!(missing, Config::default());
    }
}

//! # Process Result Module
//!
//! Esito di un singolo file per un singolo tentativo.
//!
//! Un `ProcessResult` è immutabile una volta prodotto. Tra un retry e l'altro
//! possono esistere più generazioni per lo stesso path: conta solo l'ultima.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Outcome of a file's pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProcessStatus {
    Success,
    Skipped,
    FileNotFound,
    SidecarNotFound,
    ParseError,
    TranslationError,
    TransformError,
    ValidationError,
    CleanupError,
    UnknownError,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Skipped => "Skipped",
            Self::FileNotFound => "FileNotFound",
            Self::SidecarNotFound => "SidecarNotFound",
            Self::ParseError => "ParseError",
            Self::TranslationError => "TranslationError",
            Self::TransformError => "TransformError",
            Self::ValidationError => "ValidationError",
            Self::CleanupError => "CleanupError",
            Self::UnknownError => "UnknownError",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub file_path: PathBuf,
    pub status: ProcessStatus,
    pub success: bool,
    pub error: Option<String>,
    /// Indice del tentativo che ha prodotto questo risultato (0 = primo)
    pub retries: u32,
}

impl ProcessResult {
    pub fn success(file_path: PathBuf, status: ProcessStatus, retries: u32) -> Self {
        Self {
            file_path,
            status,
            success: true,
            error: None,
            retries,
        }
    }

    pub fn failure(file_path: PathBuf, status: ProcessStatus, error: String, retries: u32) -> Self {
        Self {
            file_path,
            status,
            success: false,
            error: Some(error),
            retries,
        }
    }

    pub fn from_error(file_path: PathBuf, err: PipelineError, retries: u32) -> Self {
        let status = err.status();
        Self::failure(file_path, status, err.detail(), retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NfoError;

    #[test]
    fn test_from_error_keeps_status_and_chain() {
        let err = PipelineError::Parse(NfoError::NotFound(PathBuf::from("/media/a.nfo")));
        let result = ProcessResult::from_error(PathBuf::from("/media/a.mkv"), err, 2);

        assert!(!result.success);
        assert_eq!(result.status, ProcessStatus::ParseError);
        assert_eq!(result.retries, 2);
        assert_eq!(
            result.error.as_deref(),
            Some("NFO file could not be parsed: /media/a.nfo does not exist")
        );
    }

    #[test]
    fn test_status_serializes_as_name() {
        let result = ProcessResult::success(PathBuf::from("/media/a.mkv"), ProcessStatus::Skipped, 0);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "Skipped");
        assert_eq!(json["success"], true);
        assert!(json["error"].is_null());
        assert_eq!(ProcessStatus::CleanupError.to_string(), "CleanupError");
    }
}

//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - `VmuError`: errori a livello di run (dipendenze mancanti, discovery)
//! - `NfoError`: localizzazione e parsing del sidecar NFO
//! - `ProbeError`: invocazione di ffprobe e parsing del suo output JSON
//! - `TranscodeError`: invocazione di ffmpeg
//! - `ValidationError`: confronto del fingerprint tecnico prima/dopo
//! - `ExecutorError`: transazione backup/transform/validate/commit
//! - `PipelineError`: errore per-file prodotto dal worker, mappato su `ProcessStatus`
//!
//! ## Rollback:
//! Gli errori di rollback non sostituiscono mai l'errore primario: vengono
//! raccolti in `RollbackErrors` e mostrati insieme ad esso.
//!
//! ## Esempio:
//! ```ignore
//! if !tool_exists {
//!     return Err(VmuError::MissingDependency("ffmpeg".to_string()));
//! }
//! ```

use crate::processor::ProcessStatus;
use std::fmt;
use std::path::PathBuf;

/// Errori a livello di run
#[derive(thiserror::Error, Debug)]
pub enum VmuError {
    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Discovery failed for {path}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Sidecar errors
#[derive(thiserror::Error, Debug)]
pub enum NfoError {
    #[error("{0} does not exist")]
    NotFound(PathBuf),

    #[error("{0} is a directory")]
    IsDirectory(PathBuf),

    #[error("error checking if {path} exists")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error reading nfo file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error unmarshalling nfo file {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: quick_xml::DeError,
    },
}

/// The sidecar record was absent
#[derive(thiserror::Error, Debug)]
#[error("NFO details not set")]
pub struct TranslationError;

/// Errors raised while probing a media file
#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error("failed to execute {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout_secs}s probing {path}")]
    Timeout {
        program: String,
        path: PathBuf,
        timeout_secs: u64,
    },

    #[error("{program} failed on {path}: {stderr}")]
    Failed {
        program: String,
        path: PathBuf,
        stderr: String,
    },

    #[error("invalid {program} output for {path}")]
    Parse {
        program: String,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by the external transformation tool
#[derive(thiserror::Error, Debug)]
pub enum TranscodeError {
    #[error("failed to execute {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Technical fingerprint mismatch or probe failure
#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("{field} mismatch: old: {old} new: {new}")]
    Mismatch {
        field: &'static str,
        old: String,
        new: String,
    },

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// Singolo passo di rollback fallito
#[derive(Debug)]
pub struct RollbackFailure {
    pub step: &'static str,
    pub path: PathBuf,
    pub source: std::io::Error,
}

/// Errori di rollback, uniti all'errore primario
#[derive(Debug, Default)]
pub struct RollbackErrors(pub Vec<RollbackFailure>);

impl RollbackErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, step: &'static str, path: PathBuf, source: std::io::Error) {
        self.0.push(RollbackFailure { step, path, source });
    }
}

impl fmt::Display for RollbackErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        write!(f, " (rollback also failed: ")?;
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{} {}: {}", failure.step, failure.path.display(), failure.source)?;
        }
        write!(f, ")")
    }
}

/// Errors from the transactional executor, one variant per phase
#[derive(thiserror::Error, Debug)]
pub enum ExecutorError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("backup of {path} failed")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transform failed{rollback}")]
    Transform {
        #[source]
        source: TranscodeError,
        rollback: RollbackErrors,
    },

    #[error("validation failed{rollback}")]
    Validation {
        #[source]
        source: ValidationError,
        rollback: RollbackErrors,
    },

    #[error("failed to replace {path} with the updated file{rollback}")]
    Commit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        rollback: RollbackErrors,
    },

    #[error("file updated but backup {path} could not be removed")]
    RemoveBackup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExecutorError {
    /// Status riportato dal worker, in base alla fase fallita
    pub fn status(&self) -> ProcessStatus {
        match self {
            Self::InvalidArguments(_) | Self::Backup { .. } | Self::Transform { .. } => {
                ProcessStatus::TransformError
            }
            Self::Validation { .. } => ProcessStatus::ValidationError,
            Self::Commit { .. } | Self::RemoveBackup { .. } => ProcessStatus::CleanupError,
        }
    }
}

/// Per-file pipeline error produced by a worker
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("file {path} does not exist")]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("NFO file not found")]
    SidecarNotFound(#[source] NfoError),

    #[error("NFO file could not be parsed")]
    Parse(#[source] NfoError),

    #[error("metadata translation failed")]
    Translation(#[source] TranslationError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("{0}")]
    Unknown(String),
}

impl PipelineError {
    pub fn status(&self) -> ProcessStatus {
        match self {
            Self::FileNotFound { .. } => ProcessStatus::FileNotFound,
            Self::SidecarNotFound(_) => ProcessStatus::SidecarNotFound,
            Self::Parse(_) => ProcessStatus::ParseError,
            Self::Translation(_) => ProcessStatus::TranslationError,
            Self::Executor(e) => e.status(),
            Self::Unknown(_) => ProcessStatus::UnknownError,
        }
    }

    /// Messaggio completo con tutta la catena di cause
    pub fn detail(self) -> String {
        format!("{:#}", anyhow::Error::new(self))
    }
}

//! # Transactional Executor Module
//!
//! Applica un `TranscodeCommand` a un file come una transazione: o il file
//! viene sostituito completamente, o resta identico byte per byte.
//!
//! ## Fasi:
//! 1. **Argomenti**: argv non vuoto, input esistente, output e tag presenti,
//!    nessuna sequenza pericolosa nell'argv
//! 2. **Backup**: copia byte-per-byte in `<nome>.backup.<ext>`
//! 3. **Process**: esecuzione del transcoder (nessuna shell)
//! 4. **Validate**: confronto del fingerprint tecnico backup vs output
//! 5. **Commit**: rename dell'output sull'input, poi rimozione del backup
//!
//! ## Rollback:
//! Su errore in Process/Validate/Commit: backup ripristinato sull'input,
//! output e backup rimossi. Ogni passo è best-effort e i suoi errori vengono
//! uniti all'errore primario, mai al posto suo. Se il ripristino fallisce il
//! backup viene lasciato su disco.

use crate::error::{ExecutorError, RollbackErrors};
use crate::file_manager::FileManager;
use crate::progress::{ProgressTracker, Stage};
use crate::transcoder::{TranscodeCommand, Transcoder};
use crate::validator::Validator;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sequenze rifiutate nell'argv anche se non passa mai da una shell
const DANGEROUS_SEQUENCES: &[&str] = &["&&", "rm -Rf", "|", ">", "<", "`", "$("];

pub struct Executor {
    transcoder: Arc<dyn Transcoder>,
    validator: Validator,
}

impl Executor {
    pub fn new(transcoder: Arc<dyn Transcoder>, validator: Validator) -> Self {
        Self { transcoder, validator }
    }

    /// Run `command` transactionally against its input file.
    pub async fn execute(&self, command: &TranscodeCommand, tracker: &ProgressTracker) -> Result<(), ExecutorError> {
        check_arguments(command).await?;

        let input = command.input.as_path();
        let output = command.output.as_path();
        let backup = FileManager::backup_path(input);

        // output orfano di un run interrotto
        if let Err(e) = FileManager::remove_if_exists(output).await {
            warn!("Could not remove stale output {}: {}", output.display(), e);
        }

        tracker.update_stage(input, Stage::Backup);
        if let Err(source) = FileManager::copy_file(input, &backup).await {
            if let Err(e) = FileManager::remove_if_exists(&backup).await {
                warn!("Could not remove partial backup {}: {}", backup.display(), e);
            }
            return Err(ExecutorError::Backup {
                path: backup,
                source,
            });
        }
        debug!("Backup created: {}", backup.display());

        tracker.update_stage(input, Stage::Process);
        match self.transcoder.run(&command.args).await {
            Ok(tool_output) => {
                if !tool_output.stderr.is_empty() {
                    debug!("{} stderr: {}", self.transcoder.program(), tool_output.stderr.trim());
                }
            }
            Err(source) => {
                let rollback = rollback(input, output, &backup).await;
                return Err(ExecutorError::Transform { source, rollback });
            }
        }

        tracker.update_stage(input, Stage::Validate);
        if let Err(source) = self.validator.validate(&backup, output).await {
            let rollback = rollback(input, output, &backup).await;
            return Err(ExecutorError::Validation { source, rollback });
        }

        tracker.update_stage(input, Stage::Cleanup);
        if let Err(source) = FileManager::move_file(output, input).await {
            let rollback = rollback(input, output, &backup).await;
            return Err(ExecutorError::Commit {
                path: input.to_path_buf(),
                source,
                rollback,
            });
        }
        FileManager::remove_if_exists(&backup)
            .await
            .map_err(|source| ExecutorError::RemoveBackup {
                path: backup.clone(),
                source,
            })?;

        info!("Updated metadata of {}", input.display());
        Ok(())
    }
}

async fn check_arguments(command: &TranscodeCommand) -> Result<(), ExecutorError> {
    if command.args.is_empty() {
        return Err(ExecutorError::InvalidArguments("no arguments provided".to_string()));
    }
    if command.input.as_os_str().is_empty() {
        return Err(ExecutorError::InvalidArguments("input file not specified".to_string()));
    }
    if tokio::fs::metadata(&command.input).await.is_err() {
        return Err(ExecutorError::InvalidArguments(format!(
            "input file {} does not exist",
            command.input.display()
        )));
    }
    if command.output.as_os_str().is_empty() {
        return Err(ExecutorError::InvalidArguments("output file not specified".to_string()));
    }
    if command.tags.is_empty() {
        return Err(ExecutorError::InvalidArguments("no metadata to write".to_string()));
    }

    let rendered = command.args_string();
    if let Some(sequence) = DANGEROUS_SEQUENCES.iter().find(|s| rendered.contains(*s)) {
        return Err(ExecutorError::InvalidArguments(format!(
            "potentially dangerous sequence '{}' in arguments",
            sequence
        )));
    }

    Ok(())
}

/// Ripristina l'input dal backup e rimuove i file di lavoro.
async fn rollback(input: &Path, output: &Path, backup: &Path) -> RollbackErrors {
    let mut errors = RollbackErrors::default();
    warn!("Rolling back {}", input.display());

    let reverted = match FileManager::move_file(backup, input).await {
        Ok(()) => true,
        Err(e) => {
            errors.push("revert", input.to_path_buf(), e);
            false
        }
    };

    if let Err(e) = FileManager::remove_if_exists(output).await {
        errors.push("remove output", output.to_path_buf(), e);
    }

    if reverted {
        if let Err(e) = FileManager::remove_if_exists(backup).await {
            errors.push("remove backup", backup.to_path_buf(), e);
        }
    } else {
        warn!("Keeping backup {} after failed revert", backup.display());
    }

    errors
}

//! # Transcoder Module
//!
//! Costruzione ed esecuzione del comando ffmpeg che riscrive i metadati.
//!
//! ## Responsabilità:
//! - `TranscodeCommand`: argv completo `-i <input> -c copy -metadata k=v ... <output>`
//! - `Transcoder`: trait dell'esecutore esterno (mockabile nei test)
//! - `FfmpegTranscoder`: spawn diretto di ffmpeg, nessuna shell
//!
//! ## Pipeline:
//! 1. I tag arrivano già appiattiti e ordinati (`BTreeMap`): l'argv è deterministico
//! 2. Gli stream vengono copiati senza ricodifica (`-c copy`)
//! 3. stdout/stderr vengono catturati e loggati a livello debug
//!
//! ## Esempio:
//! ```ignore
//! let command = TranscodeCommand::new(&input, &output, metadata.to_tags());
//! transcoder.run(&command.args).await?;
//! ```

use crate::args;
use crate::error::TranscodeError;
use crate::utils::render_for_log;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Fully built ffmpeg invocation for one file
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeCommand {
    pub input: PathBuf,
    pub output: PathBuf,
    pub tags: BTreeMap<String, String>,
    pub args: Vec<String>,
}

impl TranscodeCommand {
    pub fn new(input: &Path, output: &Path, tags: BTreeMap<String, String>) -> Self {
        let mut args = args!["-i", input.to_string_lossy(), "-c", "copy"];
        for (key, value) in &tags {
            args.push("-metadata".to_string());
            args.push(format!("{}={}", key, value));
        }
        args.push(output.to_string_lossy().into_owned());

        Self {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            tags,
            args,
        }
    }

    /// Argv unito da spazi, usato per il controllo delle sequenze pericolose
    pub fn args_string(&self) -> String {
        self.args.join(" ")
    }
}

/// Output catturato da un'esecuzione riuscita
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs the external transformation tool.
#[async_trait]
pub trait Transcoder: Send + Sync {
    fn program(&self) -> &str;

    async fn run(&self, args: &[String]) -> Result<ToolOutput, TranscodeError>;
}

/// [`Transcoder`] backed by the `ffmpeg` executable
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, args: &[String]) -> Result<ToolOutput, TranscodeError> {
        debug!("Running: {}", render_for_log(&self.program, args));
        let start_time = std::time::Instant::now();

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| TranscodeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(TranscodeError::Exit {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!(
            "{} completed in {:.1}s (stdout: {} bytes, stderr: {} bytes)",
            self.program,
            start_time.elapsed().as_secs_f64(),
            stdout.len(),
            stderr.len()
        );

        Ok(ToolOutput { stdout, stderr })
    }
}

/// Transcoder per i test.
///
/// Legge il report JSON dal file di input, applica i `-metadata` ai tag del
/// formato e scrive il risultato sull'output, così il prober fake vede i tag
/// aggiornati anche dopo il rename.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::probe::MediaProbe;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct FakeTranscoder {
        calls: Mutex<Vec<Vec<String>>>,
        failures: Mutex<HashMap<PathBuf, usize>>,
        altered_codec: Option<String>,
    }

    impl FakeTranscoder {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fallisce le prime `times` esecuzioni su `input`
        pub fn failing(self, input: &Path, times: usize) -> Self {
            self.failures
                .lock()
                .unwrap()
                .insert(input.to_path_buf(), times);
            self
        }

        /// Produce un output con codec video diverso (il validator deve bocciarlo)
        pub fn altering_codec(mut self, codec: &str) -> Self {
            self.altered_codec = Some(codec.to_string());
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn recorded_args(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transcoder for FakeTranscoder {
        fn program(&self) -> &str {
            "fake-ffmpeg"
        }

        async fn run(&self, args: &[String]) -> Result<ToolOutput, TranscodeError> {
            self.calls.lock().unwrap().push(args.to_vec());

            let input_pos = args.iter().position(|a| a == "-i").unwrap();
            let input = PathBuf::from(&args[input_pos + 1]);
            let output = PathBuf::from(args.last().unwrap());

            let should_fail = {
                let mut failures = self.failures.lock().unwrap();
                match failures.get_mut(&input) {
                    Some(remaining) if *remaining > 0 => {
                        *remaining -= 1;
                        true
                    }
                    _ => false,
                }
            };
            if should_fail {
                // output parziale: il rollback deve rimuoverlo
                tokio::fs::write(&output, b"partial").await.unwrap();
                return Err(TranscodeError::Exit {
                    program: "fake-ffmpeg".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "injected failure".to_string(),
                });
            }

            let content = tokio::fs::read(&input).await.unwrap();
            let mut probe: MediaProbe = serde_json::from_slice(&content).unwrap_or_default();
            for pair in args.windows(2).filter(|w| w[0] == "-metadata") {
                if let Some((key, value)) = pair[1].split_once('=') {
                    probe.format.tags.insert(key.to_string(), value.to_string());
                }
            }
            if let Some(codec) = &self.altered_codec {
                if let Some(video) = probe.streams.iter_mut().find(|s| s.codec_type == "video") {
                    video.codec_name = codec.clone();
                }
            }
            tokio::fs::write(&output, serde_json::to_vec_pretty(&probe).unwrap())
                .await
                .unwrap();

            Ok(ToolOutput::default())
        }
    }
}

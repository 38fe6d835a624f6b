//! # Media Probe Module
//!
//! Espone le caratteristiche tecniche di un file video tramite `ffprobe`.
//!
//! ## Responsabilità:
//! - `MediaProber`: trait usato da worker e validator (mockabile nei test)
//! - `FfprobeProber`: implementazione reale, un processo `ffprobe` per chiamata
//! - `MediaProbe`: report JSON di ffprobe (stream + format + tag esistenti)
//! - `TechnicalFingerprint`: tupla usata per il confronto prima/dopo
//!
//! Ogni probe è indipendente (nessuno stato condiviso): più worker possono
//! chiamare lo stesso prober in parallelo.

use crate::args;
use crate::error::ProbeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Probes a media file for its technical characteristics and tags.
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path, timeout: Duration) -> Result<MediaProbe, ProbeError>;
}

/// ffprobe `-show_format -show_streams` report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaProbe {
    pub streams: Vec<ProbeStream>,
    pub format: ProbeFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeStream {
    pub codec_type: String,
    pub codec_name: String,
    pub bit_rate: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub display_aspect_ratio: Option<String>,
    pub channels: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeFormat {
    pub size: Option<String>,
    pub duration: Option<String>,
    pub tags: HashMap<String, String>,
}

/// Caratteristiche che una riscrittura dei metadati non deve alterare.
///
/// Durata e dimensione sono escluse: il remux le perturba sempre un po'.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TechnicalFingerprint {
    pub video_codec: String,
    pub video_bitrate: String,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub audio_channels: u32,
}

impl MediaProbe {
    pub fn first_video_stream(&self) -> Option<&ProbeStream> {
        self.streams.iter().find(|s| s.codec_type == "video")
    }

    pub fn first_audio_stream(&self) -> Option<&ProbeStream> {
        self.streams.iter().find(|s| s.codec_type == "audio")
    }

    /// Existing container-level tags
    pub fn tags(&self) -> &HashMap<String, String> {
        &self.format.tags
    }

    pub fn fingerprint(&self) -> TechnicalFingerprint {
        let video = self.first_video_stream();
        let audio = self.first_audio_stream();

        TechnicalFingerprint {
            video_codec: video.map(|s| s.codec_name.clone()).unwrap_or_default(),
            video_bitrate: video.and_then(|s| s.bit_rate.clone()).unwrap_or_default(),
            width: video.and_then(|s| s.width).unwrap_or(0),
            height: video.and_then(|s| s.height).unwrap_or(0),
            aspect_ratio: video
                .and_then(|s| s.display_aspect_ratio.clone())
                .unwrap_or_default(),
            audio_codec: audio.map(|s| s.codec_name.clone()).unwrap_or_default(),
            audio_bitrate: audio.and_then(|s| s.bit_rate.clone()).unwrap_or_default(),
            audio_channels: audio.and_then(|s| s.channels).unwrap_or(0),
        }
    }
}

/// [`MediaProber`] backed by the `ffprobe` executable
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: String,
}

impl FfprobeProber {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path, timeout: Duration) -> Result<MediaProbe, ProbeError> {
        debug!("Probing {} with {}", path.display(), self.program);

        let mut cmd = Command::new(&self.program);
        cmd.args(args![
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            path.to_string_lossy(),
        ])
        .stdin(Stdio::null())
        .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| ProbeError::Spawn {
                program: self.program.clone(),
                source,
            })?,
            Err(_) => {
                return Err(ProbeError::Timeout {
                    program: self.program.clone(),
                    path: path.to_path_buf(),
                    timeout_secs: timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            return Err(ProbeError::Failed {
                program: self.program.clone(),
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|source| ProbeError::Parse {
            program: self.program.clone(),
            path: path.to_path_buf(),
            source,
        })
    }
}

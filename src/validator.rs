//! # Validator Module
//!
//! Verifica che la riscrittura dei metadati non abbia toccato gli stream.
//!
//! ## Responsabilità:
//! - Probe del file originale (backup) e di quello nuovo, con timeout
//! - Confronto fail-fast del `TechnicalFingerprint`, sempre nello stesso ordine:
//!   video codec, video bitrate, height, width, aspect ratio,
//!   audio codec, audio bitrate, audio channels

use crate::error::ValidationError;
use crate::probe::{MediaProber, TechnicalFingerprint};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct Validator {
    prober: Arc<dyn MediaProber>,
    timeout: Duration,
}

impl Validator {
    pub fn new(prober: Arc<dyn MediaProber>, timeout: Duration) -> Self {
        Self { prober, timeout }
    }

    /// Compare the technical fingerprint of `old` and `new`.
    pub async fn validate(&self, old: &Path, new: &Path) -> Result<(), ValidationError> {
        debug!("Validating {} against {}", new.display(), old.display());

        let old_probe = self.prober.probe(old, self.timeout).await?;
        let new_probe = self.prober.probe(new, self.timeout).await?;

        compare(&old_probe.fingerprint(), &new_probe.fingerprint())
    }
}

fn compare(old: &TechnicalFingerprint, new: &TechnicalFingerprint) -> Result<(), ValidationError> {
    let checks: [(&'static str, String, String); 8] = [
        ("video codec", old.video_codec.clone(), new.video_codec.clone()),
        ("video bitrate", old.video_bitrate.clone(), new.video_bitrate.clone()),
        ("height", old.height.to_string(), new.height.to_string()),
        ("width", old.width.to_string(), new.width.to_string()),
        ("aspect ratio", old.aspect_ratio.clone(), new.aspect_ratio.clone()),
        ("audio codec", old.audio_codec.clone(), new.audio_codec.clone()),
        ("audio bitrate", old.audio_bitrate.clone(), new.audio_bitrate.clone()),
        ("audio channels", old.audio_channels.to_string(), new.audio_channels.to_string()),
    ];

    for (field, old, new) in checks {
        if old != new {
            return Err(ValidationError::Mismatch { field, old, new });
        }
    }

    Ok(())
}

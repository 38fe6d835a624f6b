//! # NFO Sidecar Module
//!
//! Localizza e interpreta il sidecar `.nfo` (XML `episodedetails` in stile
//! Kodi/Jellyfin) che accompagna ogni episodio.
//!
//! ## Responsabilità:
//! - `locate_sidecar()`: stesso nome, stessa directory, estensione `.nfo`
//! - `parse_sidecar()`: deserializza l'XML in `EpisodeDetails`
//!
//! Gli elementi non mappati (`art`, `fileinfo`, `lockdata`, ...) vengono ignorati.
//! Un elemento numerico vuoto (`<year></year>`) vale 0.

use crate::error::NfoError;
use crate::file_manager::FileManager;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Parsed `<episodedetails>` document
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EpisodeDetails {
    pub title: String,
    pub plot: String,
    #[serde(deserialize_with = "lenient_number")]
    pub runtime: u32,
    #[serde(rename = "showtitle")]
    pub show_title: String,
    #[serde(deserialize_with = "lenient_number")]
    pub season: u32,
    #[serde(deserialize_with = "lenient_number")]
    pub episode: u32,
    #[serde(rename = "genre")]
    pub genres: Vec<String>,
    #[serde(rename = "director")]
    pub directors: Vec<String>,
    #[serde(rename = "actor")]
    pub actors: Vec<Actor>,
    #[serde(rename = "imdbid")]
    pub imdb_id: String,
    #[serde(rename = "tvdbid")]
    pub tvdb_id: String,
    #[serde(deserialize_with = "lenient_number")]
    pub year: u32,
    pub writer: String,
    pub credits: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Actor {
    pub name: String,
    pub role: String,
}

/// Numeri come testo: spazi ignorati, vuoto -> 0
fn lenient_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed.parse::<u32>().map_err(serde::de::Error::custom)
}

/// Locate the sidecar for `path`.
pub fn locate_sidecar(path: &Path) -> Result<PathBuf, NfoError> {
    let nfo_path = FileManager::sidecar_path(path);
    debug!("Matching NFO file {} -> {}", path.display(), nfo_path.display());

    match std::fs::metadata(&nfo_path) {
        Ok(meta) if meta.is_dir() => Err(NfoError::IsDirectory(nfo_path)),
        Ok(_) => Ok(nfo_path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(NfoError::NotFound(nfo_path)),
        Err(source) => Err(NfoError::Stat { path: nfo_path, source }),
    }
}

/// Parse the sidecar at `path` into an [`EpisodeDetails`].
pub async fn parse_sidecar(path: &Path) -> Result<EpisodeDetails, NfoError> {
    debug!("Parsing NFO file {}", path.display());

    let content = tokio::fs::read_to_string(path).await.map_err(|source| {
        error!("error reading nfo file {}: {}", path.display(), source);
        NfoError::Read {
            path: path.to_path_buf(),
            source,
        }
    })?;

    parse_str(&content).map_err(|source| {
        error!("error unmarshalling nfo file {}: {}", path.display(), source);
        NfoError::Decode {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn parse_str(content: &str) -> Result<EpisodeDetails, quick_xml::DeError> {
    quick_xml::de::from_str(content)
}

//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file e la discovery dei video.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva dei file video in una directory
//! - Derivazione dei path (backup, output temporaneo, sidecar NFO)
//! - Copia byte-per-byte con rilascio esplicito degli handle
//! - Rimozione tollerante di file già assenti
//!
//! ## Formati supportati:
//! - **Video**: AVI, MP4, MKV, MPG, MOV, WMV, FLV, M4V
//!
//! ## Path derivati:
//! ```text
//! /media/show/episode.mkv
//!   backup  -> /media/show/episode.backup.mkv
//!   output  -> /media/show/episode.vmu-edit.mkv
//!   sidecar -> /media/show/episode.nfo
//! ```

use crate::error::VmuError;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Tag inserito prima dell'estensione per il file di backup
pub const BACKUP_TAG: &str = "backup";

/// Tag inserito prima dell'estensione per l'output di ffmpeg
pub const OUTPUT_TAG: &str = "vmu-edit";

/// Estensione del sidecar
pub const SIDECAR_EXTENSION: &str = "nfo";

const VIDEO_EXTENSIONS: &[&str] = &["avi", "mp4", "mkv", "mpg", "mov", "wmv", "flv", "m4v"];

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Find all supported video files under `media_dir`, sorted and unique.
    pub fn find_media_files(media_dir: &Path) -> Result<Vec<PathBuf>, VmuError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(media_dir) {
            let entry = entry.map_err(|source| VmuError::Discovery {
                path: media_dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if Self::is_supported_format(path) && !Self::is_work_file(path) {
                debug!("Found file: {}", path.display());
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        files.dedup();
        debug!("Found {} files", files.len());
        Ok(files)
    }

    /// Check if a file format is supported
    pub fn is_supported_format(path: &Path) -> bool {
        match path.extension() {
            Some(ext) => {
                let ext_lower = ext.to_string_lossy().to_lowercase();
                VIDEO_EXTENSIONS.contains(&ext_lower.as_str())
            }
            None => false,
        }
    }

    /// Backup o output lasciati da un run interrotto: non vanno riprocessati
    fn is_work_file(path: &Path) -> bool {
        let stem = match path.file_stem() {
            Some(stem) => stem.to_string_lossy(),
            None => return false,
        };
        stem.ends_with(&format!(".{}", BACKUP_TAG)) || stem.ends_with(&format!(".{}", OUTPUT_TAG))
    }

    /// Insert `tag` between the file name and its extension.
    ///
    /// `/home/user/video.mkv` + `tagged` -> `/home/user/video.tagged.mkv`
    pub fn insert_tag(path: &Path, tag: &str) -> PathBuf {
        let mut name = OsString::from(path.file_stem().unwrap_or_default());
        name.push(".");
        name.push(tag);
        if let Some(ext) = path.extension() {
            name.push(".");
            name.push(ext);
        }
        path.with_file_name(name)
    }

    pub fn backup_path(path: &Path) -> PathBuf {
        Self::insert_tag(path, BACKUP_TAG)
    }

    pub fn output_path(path: &Path) -> PathBuf {
        Self::insert_tag(path, OUTPUT_TAG)
    }

    /// Sidecar atteso: stessa directory, stesso nome, estensione `.nfo`
    pub fn sidecar_path(path: &Path) -> PathBuf {
        path.with_extension(SIDECAR_EXTENSION)
    }

    /// Copia byte-per-byte `source` su `dest` (creato o troncato).
    ///
    /// Il flush finale su disco viene solo loggato se fallisce: il contenuto è
    /// già stato scritto e l'errore primario resta quello della copia.
    pub async fn copy_file(source: &Path, dest: &Path) -> io::Result<u64> {
        let mut reader = fs::File::open(source).await?;
        let mut writer = fs::File::create(dest).await?;

        let copied = tokio::io::copy(&mut reader, &mut writer).await?;
        writer.flush().await?;

        if let Err(e) = writer.sync_all().await {
            warn!("Failed to sync {} after copy: {}", dest.display(), e);
        }

        Ok(copied)
    }

    /// Move `source` over `dest`.
    ///
    /// Prova prima un rename; se fallisce (es. device diversi) ripiega su
    /// copia + rimozione della sorgente.
    pub async fn move_file(source: &Path, dest: &Path) -> io::Result<()> {
        match fs::rename(source, dest).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!(
                    "Rename {} -> {} failed ({}), falling back to copy",
                    source.display(),
                    dest.display(),
                    e
                );
                Self::copy_file(source, dest).await?;
                fs::remove_file(source).await
            }
        }
    }

    /// Remove a file, treating "already gone" as success.
    pub async fn remove_if_exists(path: &Path) -> io::Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_insert_tag() {
        let cases = [
            ("/home/user/video.mkv", "tagged", "/home/user/video.tagged.mkv"),
            ("/home/user/video.file.mkv", "tagged", "/home/user/video.file.tagged.mkv"),
            ("/home/user/video", "tagged", "/home/user/video.tagged"),
            (
                "/home/user/my videos/video file.mkv",
                "tagged",
                "/home/user/my videos/video file.tagged.mkv",
            ),
        ];

        for (path, tag, expected) in cases {
            assert_eq!(FileManager::insert_tag(Path::new(path), tag), PathBuf::from(expected));
        }
    }

    #[test]
    fn test_derived_paths() {
        let path = Path::new("/media/show/s01e01.mkv");
        assert_eq!(FileManager::backup_path(path), PathBuf::from("/media/show/s01e01.backup.mkv"));
        assert_eq!(FileManager::output_path(path), PathBuf::from("/media/show/s01e01.vmu-edit.mkv"));
        assert_eq!(FileManager::sidecar_path(path), PathBuf::from("/media/show/s01e01.nfo"));
    }

    #[test]
    fn test_find_media_files() {
        let temp_dir = TempDir::new().unwrap();
        let sub_dir = temp_dir.path().join("subdir");
        std::fs::create_dir(&sub_dir).unwrap();

        let videos = [
            temp_dir.path().join("video1.mkv"),
            temp_dir.path().join("video2.mp4"),
            temp_dir.path().join("video3.AVI"),
            sub_dir.join("video4.wmv"),
            sub_dir.join("video5.mov"),
        ];
        let others = [
            temp_dir.path().join("document.txt"),
            temp_dir.path().join("video1.nfo"),
            temp_dir.path().join("video2.backup.mp4"),
            sub_dir.join("video4.vmu-edit.wmv"),
        ];
        for file in videos.iter().chain(others.iter()) {
            std::fs::write(file, b"x").unwrap();
        }

        let found = FileManager::find_media_files(temp_dir.path()).unwrap();
        assert_eq!(found.len(), videos.len());
        for video in &videos {
            assert!(found.contains(video), "{} should be found", video.display());
        }
    }

    #[test]
    fn test_find_media_files_missing_root() {
        let result = FileManager::find_media_files(Path::new("/path/to/nonexistent/dir"));
        assert!(matches!(result, Err(VmuError::Discovery { .. })));
    }

    #[tokio::test]
    async fn test_copy_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.mkv");
        let dest = temp_dir.path().join("a.backup.mkv");
        std::fs::write(&source, b"original bytes").unwrap();

        let copied = FileManager::copy_file(&source, &dest).await.unwrap();
        assert_eq!(copied, 14);
        assert_eq!(std::fs::read(&dest).unwrap(), b"original bytes");

        FileManager::remove_if_exists(&dest).await.unwrap();
        assert!(!dest.exists());
        // già rimosso
        FileManager::remove_if_exists(&dest).await.unwrap();
    }

    #[tokio::test]
    async fn test_move_file_replaces_destination() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.vmu-edit.mkv");
        let dest = temp_dir.path().join("a.mkv");
        std::fs::write(&source, b"updated").unwrap();
        std::fs::write(&dest, b"original").unwrap();

        FileManager::move_file(&source, &dest).await.unwrap();
        assert!(!source.exists());
        assert_eq!(std::fs::read(&dest).unwrap(), b"updated");
    }
}

//! # Platform-specific utilities
//!
//! Questo modulo centralizza la risoluzione dei tool esterni (`ffmpeg`,
//! `ffprobe`) e la verifica delle dipendenze prima di un run.
//!
//! Un path esplicito in `Config` vince sempre; altrimenti il tool viene
//! cercato nel `PATH` con `which` (bit di esecuzione e `PATHEXT` inclusi).

use crate::config::Config;
use crate::error::VmuError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";

/// Resolve a tool: explicit path first, then `PATH`.
pub fn resolve_tool(base_name: &str, explicit: Option<&Path>) -> Result<PathBuf, which::Error> {
    let cwd = std::env::current_dir().unwrap_or_default();
    resolve_tool_in(base_name, explicit, std::env::var_os("PATH"), cwd)
}

/// Come [`resolve_tool`], ma su un `PATH` e una directory di lavoro dati.
pub fn resolve_tool_in<P: AsRef<OsStr>>(
    base_name: &str,
    explicit: Option<&Path>,
    path_var: Option<P>,
    cwd: impl AsRef<Path>,
) -> Result<PathBuf, which::Error> {
    let resolved = match explicit {
        Some(path) => which::which_in(path, path_var, cwd),
        None => which::which_in(base_name, path_var, cwd),
    };
    debug!("Resolved {} -> {:?}", base_name, resolved);
    resolved
}

/// Resolved executables for a run
#[derive(Debug, Clone, PartialEq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

/// Check that every required tool is available
pub fn check_dependencies(config: &Config) -> Result<ToolPaths, VmuError> {
    let ffmpeg = resolve_tool(FFMPEG, config.ffmpeg_path.as_deref()).map_err(|e| {
        VmuError::MissingDependency(format!("{} is required to rewrite metadata ({})", FFMPEG, e))
    })?;
    let ffprobe = resolve_tool(FFPROBE, config.ffprobe_path.as_deref()).map_err(|e| {
        VmuError::MissingDependency(format!("{} is required to inspect media files ({})", FFPROBE, e))
    })?;

    Ok(ToolPaths { ffmpeg, ffprobe })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn tool(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn test_resolve_skips_non_executable() {
        let shadow_dir = TempDir::new().unwrap();
        let real_dir = TempDir::new().unwrap();
        tool(shadow_dir.path(), FFPROBE, 0o644);
        let real = tool(real_dir.path(), FFPROBE, 0o755);

        let path_var = std::env::join_paths([shadow_dir.path(), real_dir.path()]).unwrap();
        let resolved = resolve_tool_in(FFPROBE, None, Some(&path_var), real_dir.path()).unwrap();
        assert_eq!(resolved, real);

        assert!(resolve_tool_in(FFMPEG, None, Some(&path_var), real_dir.path()).is_err());
        assert!(resolve_tool_in(FFPROBE, None, None::<&OsStr>, real_dir.path()).is_err());
    }

    #[test]
    fn test_explicit_path_wins() {
        let temp_dir = TempDir::new().unwrap();
        let ffmpeg = tool(temp_dir.path(), "my-ffmpeg", 0o755);
        let ffprobe = tool(temp_dir.path(), "my-ffprobe", 0o755);

        let config = Config {
            ffmpeg_path: Some(ffmpeg.clone()),
            ffprobe_path: Some(ffprobe.clone()),
            ..Default::default()
        };
        assert_eq!(check_dependencies(&config).unwrap(), ToolPaths { ffmpeg, ffprobe });
    }

    #[test]
    fn test_missing_explicit_tool() {
        let temp_dir = TempDir::new().unwrap();
        let not_executable = tool(temp_dir.path(), "ffmpeg", 0o644);

        for ffmpeg_path in [PathBuf::from("/path/to/nonexistent/ffmpeg"), not_executable] {
            let config = Config {
                ffmpeg_path: Some(ffmpeg_path),
                ..Default::default()
            };
            let err = check_dependencies(&config).unwrap_err();
            assert!(err.to_string().contains("ffmpeg is required"));
        }
    }
}

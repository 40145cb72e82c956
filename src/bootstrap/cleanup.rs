//! Legacy path removal.
//!
//! Files left by older terminal setups (the YAML alacritty config, plus
//! anything listed in `cleanup.extra_paths`) are backed up, then removed.

use crate::backup::BackupDir;
use crate::layout::Layout;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Always-removed paths, relative to home.
pub const LEGACY_PATHS: &[&str] = &[".config/alacritty/alacritty.yml"];

/// Absolute legacy paths for this run.
pub fn legacy_paths(layout: &Layout, extra: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = LEGACY_PATHS.iter().map(|p| layout.home.join(p)).collect();
    for path in extra {
        let path = layout.home.join(path);
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}

/// Back up and remove `path`.
///
/// Returns the backup location, or `None` when nothing was there. If the
/// backup fails the path is left alone.
pub fn remove_legacy(path: &Path, backups: &mut BackupDir) -> Result<Option<PathBuf>> {
    let Some(backup) = backups.backup(path)? else {
        return Ok(None);
    };

    let meta = fs::symlink_metadata(path)
        .with_context(|| format!("inspecting '{}'", path.display()))?;
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.with_context(|| format!("removing legacy '{}'", path.display()))?;
    Ok(Some(backup))
}

//! Where things go on the host.
//!
//! Every path the run touches is derived once, here, from the home
//! directory and platform. Binary lookups go through [`Layout::find_binary`]
//! so that tools installed into `~/.local/bin` during this run are found
//! without editing the process `PATH`.

use crate::config::APP_DIR;
use crate::platform::Platform;
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub home: PathBuf,
    /// XDG-style config root (`~/.config`), also used on macOS.
    pub config_dir: PathBuf,
    /// Plugin checkouts and other program data.
    pub data_dir: PathBuf,
    /// User binaries installed by fallback scripts.
    pub local_bin: PathBuf,
    /// Resumable downloads.
    pub cache_dir: PathBuf,
    /// Per-user font directory.
    pub font_dir: PathBuf,
    /// Parent of the per-run timestamped backup directories.
    pub backup_root: PathBuf,
    search_path: OsString,
}

impl Layout {
    /// Layout for the current user.
    pub fn detect(platform: &Platform) -> Result<Self> {
        let home = dirs::home_dir().context("cannot determine home directory")?;
        let path = std::env::var_os("PATH").unwrap_or_default();
        Ok(Self::from_home(home, platform, path))
    }

    /// Layout rooted at `home` with an explicit base search path.
    pub fn from_home(home: PathBuf, platform: &Platform, path: OsString) -> Self {
        let local_bin = home.join(".local/bin");
        let font_dir = if platform.is_macos() {
            home.join("Library/Fonts")
        } else {
            home.join(".local/share/fonts")
        };

        let mut dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();
        if !dirs.contains(&local_bin) {
            dirs.push(local_bin.clone());
        }
        let search_path = std::env::join_paths(dirs).unwrap_or(path);

        Self {
            config_dir: home.join(".config"),
            data_dir: home.join(".local/share").join(APP_DIR),
            cache_dir: home.join(".cache").join(APP_DIR),
            backup_root: home.join(format!(".{APP_DIR}-backups")),
            local_bin,
            font_dir,
            home,
            search_path,
        }
    }

    /// Directory holding cloned zsh plugins.
    pub fn plugin_dir(&self) -> PathBuf {
        self.data_dir.join("plugins")
    }

    /// Resolve a binary on `PATH` plus `~/.local/bin`.
    pub fn find_binary(&self, name: &str) -> Option<PathBuf> {
        which::which_in(name, Some(&self.search_path), &self.home).ok()
    }

    /// First of `names` that resolves.
    pub fn find_any(&self, names: &[&str]) -> Option<PathBuf> {
        names.iter().find_map(|name| self.find_binary(name))
    }

    /// `path` relative to home when possible, for display.
    pub fn pretty<'a>(&self, path: &'a Path) -> std::borrow::Cow<'a, str> {
        match path.strip_prefix(&self.home) {
            Ok(rel) => format!("~/{}", rel.display()).into(),
            Err(_) => path.to_string_lossy(),
        }
    }
}

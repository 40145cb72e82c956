//! Git checkouts for plugins.
//!
//! A missing checkout is shallow-cloned; a present one is fast-forwarded.
//! Clone failures are errors. Update failures only warn: the existing copy
//! still works. Anything already at the checkout path that is not a git
//! checkout is backed up and replaced, but only once a clone has succeeded.

use crate::backup::BackupDir;
use crate::config::NetworkConfig;
use crate::process::{retry, Cmd, RetryPolicy};
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What [`ensure_repo`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    /// Fresh shallow clone.
    Cloned,
    /// Existing checkout fast-forwarded.
    Updated,
    /// Existing checkout kept because the update failed.
    Stale,
}

/// Clone `url` into `dir`, or update it if it is already a checkout.
pub fn ensure_repo(
    url: &str,
    dir: &Path,
    network: &NetworkConfig,
    policy: &RetryPolicy,
    backups: &mut BackupDir,
) -> Result<RepoState> {
    if dir.join(".git").exists() {
        let outcome = git(network)
            .arg("-C")
            .arg(dir)
            .args(["pull", "--ff-only", "--quiet"])
            .run_with_retry(policy);
        if outcome.success() {
            info!("updated {}", dir.display());
            return Ok(RepoState::Updated);
        }
        warn!(
            "could not update {} (status {}); keeping existing checkout",
            dir.display(),
            outcome.code
        );
        return Ok(RepoState::Stale);
    }

    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating checkout parent '{}'", parent.display()))?;
    }

    let partial = partial_path(dir);
    let clone = git(network)
        .args(["clone", "--depth=1", "--quiet", url])
        .arg(&partial);

    info!("cloning {url}");
    let outcome = retry(policy, |_| {
        // A failed attempt may leave a half-written checkout behind.
        if let Err(err) = remove_if_exists(&partial) {
            warn!("{err:#}");
        }
        clone.status_code()
    });
    if !outcome.success() {
        remove_if_exists(&partial)?;
    }
    outcome.into_result(&format!("git clone {url}"))?;

    if fs::symlink_metadata(dir).is_ok() {
        let saved = backups.backup(dir)?;
        warn!(
            "{} is not a git checkout; replacing it (backup: {})",
            dir.display(),
            saved.map_or_else(|| "none".to_string(), |p| p.display().to_string())
        );
        remove_if_exists(dir)?;
    }
    fs::rename(&partial, dir).with_context(|| {
        format!(
            "moving clone '{}' into place at '{}'",
            partial.display(),
            dir.display()
        )
    })?;
    Ok(RepoState::Cloned)
}

fn git(network: &NetworkConfig) -> Cmd {
    Cmd::new("git")
        .env("GIT_TERMINAL_PROMPT", "0")
        .envs(network.proxy_env())
}

fn partial_path(dir: &Path) -> PathBuf {
    let mut name = dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("checkout"));
    name.push(".partial");
    dir.with_file_name(name)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    let removed = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(_) => return Ok(()),
    };
    removed.with_context(|| format!("removing '{}'", path.display()))
}

//! Login shell change.

use crate::layout::Layout;
use crate::process::Cmd;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const ETC_SHELLS: &str = "/etc/shells";

/// What [`change_login_shell`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellChange {
    /// `$SHELL` already points at zsh.
    AlreadyZsh,
    /// Turned off by configuration.
    Disabled,
    Changed(PathBuf),
}

/// Whether `shell` (a `$SHELL` value) is zsh.
pub fn is_zsh(shell: &str) -> bool {
    Path::new(shell.trim())
        .file_name()
        .is_some_and(|name| name == "zsh")
}

/// Whether `/etc/shells` content lists `zsh`.
pub fn listed_in_shells(contents: &str, zsh: &Path) -> bool {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .any(|line| Path::new(line) == zsh)
}

/// Run `chsh -s <zsh>` unless already on zsh or disabled.
///
/// `chsh` may prompt for a password, so it runs with inherited stdio.
pub fn change_login_shell(layout: &Layout, enabled: bool) -> Result<ShellChange> {
    if !enabled {
        return Ok(ShellChange::Disabled);
    }
    if std::env::var("SHELL").is_ok_and(|shell| is_zsh(&shell)) {
        return Ok(ShellChange::AlreadyZsh);
    }

    let zsh = layout
        .find_binary("zsh")
        .context("zsh is not installed; cannot make it the login shell")?;
    match std::fs::read_to_string(ETC_SHELLS) {
        Ok(contents) if !listed_in_shells(&contents, &zsh) => warn!(
            "{} is not listed in {ETC_SHELLS}; chsh may refuse it",
            zsh.display()
        ),
        Ok(_) => {}
        Err(err) => warn!("reading {ETC_SHELLS}: {err}"),
    }

    info!("changing login shell to {}", zsh.display());
    let chsh = Cmd::new("chsh").arg("-s").arg(&zsh);
    let code = chsh.status_code();
    if code != 0 {
        bail!("'{}' exited with status {code}", chsh.display());
    }
    Ok(ShellChange::Changed(zsh))
}

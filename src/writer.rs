//! Atomic config writer.
//!
//! Content is rendered into `<destination>.tmp` next to the destination,
//! checked for emptiness, the previous destination is backed up, and the
//! temporary file is renamed into place. Readers see either the old file
//! or the complete new one.
//!
//! # Example
//!
//! ```rust,ignore
//! use devshell_bootstrap::backup::BackupDir;
//! use devshell_bootstrap::writer::ConfigWriter;
//!
//! let mut writer = ConfigWriter::new(BackupDir::new(backup_root));
//! writer.write_str(&home.join(".zshrc"), &rendered)?;
//! ```

use crate::backup::BackupDir;
use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// What a successful write did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub destination: PathBuf,
    /// Copy of the previous destination, when there was one.
    pub backup: Option<PathBuf>,
}

/// Writes config artifacts, backing up whatever they replace.
#[derive(Debug)]
pub struct ConfigWriter {
    backups: BackupDir,
}

impl ConfigWriter {
    pub fn new(backups: BackupDir) -> Self {
        Self { backups }
    }

    pub fn backups(&self) -> &BackupDir {
        &self.backups
    }

    pub fn backups_mut(&mut self) -> &mut BackupDir {
        &mut self.backups
    }

    /// Render `produce` into `destination` atomically.
    ///
    /// Empty output is an error and leaves the destination untouched.
    pub fn write<F>(&mut self, destination: &Path, produce: F) -> Result<WriteOutcome>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory '{}'", parent.display()))?;
        }

        let tmp = tmp_path(destination);
        if let Err(err) = render_into(&tmp, produce) {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }

        let len = fs::metadata(&tmp)
            .with_context(|| format!("inspecting rendered config '{}'", tmp.display()))?
            .len();
        if len == 0 {
            fs::remove_file(&tmp)
                .with_context(|| format!("removing empty render '{}'", tmp.display()))?;
            bail!(
                "refusing to install '{}': generated content is empty",
                destination.display()
            );
        }

        let backup = self.backups.backup(destination)?;
        if destination.is_dir() && !destination.is_symlink() {
            fs::remove_dir_all(destination).with_context(|| {
                format!("removing directory in the way of '{}'", destination.display())
            })?;
        }
        fs::rename(&tmp, destination).with_context(|| {
            format!(
                "moving '{}' into place at '{}'",
                tmp.display(),
                destination.display()
            )
        })?;

        info!("wrote {}", destination.display());
        Ok(WriteOutcome {
            destination: destination.to_path_buf(),
            backup,
        })
    }

    /// Write a pre-rendered string.
    pub fn write_str(&mut self, destination: &Path, content: &str) -> Result<WriteOutcome> {
        self.write(destination, |out| out.write_all(content.as_bytes()))
    }
}

fn render_into<F>(tmp: &Path, produce: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let file =
        File::create(tmp).with_context(|| format!("creating temporary '{}'", tmp.display()))?;
    let mut out = BufWriter::new(file);
    produce(&mut out).with_context(|| format!("rendering into '{}'", tmp.display()))?;
    let file = out
        .into_inner()
        .map_err(|err| err.into_error())
        .with_context(|| format!("flushing '{}'", tmp.display()))?;
    file.sync_all()
        .with_context(|| format!("syncing '{}'", tmp.display()))?;
    Ok(())
}

/// `<destination>.tmp`, in the same directory so the final rename stays on
/// one filesystem.
fn tmp_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("config"));
    name.push(".tmp");
    destination.with_file_name(name)
}

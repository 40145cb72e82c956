//! Per-run backup directory.
//!
//! Every file the run is about to replace or remove is copied here first.
//! The directory is created lazily by the first backup and named with its
//! creation timestamp, so a run that changes nothing leaves nothing behind.
//! Backups are never deleted by the program.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Lazily created, timestamped backup directory under `root`.
#[derive(Debug)]
pub struct BackupDir {
    root: PathBuf,
    dir: Option<PathBuf>,
}

impl BackupDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dir: None,
        }
    }

    /// The backup directory, if any backup has been made this run.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Copy `path` into the backup directory.
    ///
    /// Returns `None` when there is nothing at `path`. A previous backup of
    /// the same basename in this run is replaced.
    pub fn backup(&mut self, path: &Path) -> Result<Option<PathBuf>> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("inspecting '{}'", path.display()))
            }
        };

        let name = path
            .file_name()
            .with_context(|| format!("cannot back up '{}': no file name", path.display()))?;
        let target = self.ensure_dir()?.join(name);
        remove_existing(&target)?;

        if meta.file_type().is_symlink() {
            backup_link(path, &target)?;
        } else if meta.is_dir() {
            copy_tree(path, &target)?;
        } else {
            copy_file(path, &target)?;
        }

        debug!("backed up {} -> {}", path.display(), target.display());
        Ok(Some(target))
    }

    fn ensure_dir(&mut self) -> Result<&Path> {
        if self.dir.is_none() {
            let dir = unique_timestamped_dir(&self.root)?;
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating backup directory '{}'", dir.display()))?;
            info!("backups will be stored in {}", dir.display());
            self.dir = Some(dir);
        }
        Ok(self.dir.as_deref().unwrap_or(&self.root))
    }
}

fn timestamp() -> Result<String> {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!(
        "[year][month][day]-[hour][minute][second]"
    ))
    .context("formatting backup timestamp")
}

fn unique_timestamped_dir(root: &Path) -> Result<PathBuf> {
    let stamp = timestamp()?;
    let mut candidate = root.join(&stamp);
    let mut n = 1;
    while candidate.exists() {
        candidate = root.join(format!("{stamp}-{n}"));
        n += 1;
    }
    Ok(candidate)
}

fn remove_existing(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path)
            .with_context(|| format!("replacing previous backup '{}'", path.display())),
        Ok(_) => fs::remove_file(path)
            .with_context(|| format!("replacing previous backup '{}'", path.display())),
        Err(_) => Ok(()),
    }
}

fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)
        .with_context(|| format!("backing up '{}' to '{}'", src.display(), dst.display()))?;
    Ok(())
}

/// Back up a symlinked path by the content it points at.
///
/// A dangling link is kept as a link, with a relative target made absolute
/// so it still names the same place from inside the backup directory.
fn backup_link(path: &Path, target: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => {
            let resolved = fs::canonicalize(path)
                .with_context(|| format!("resolving symlink '{}'", path.display()))?;
            copy_tree(&resolved, target)
        }
        Ok(_) => copy_file(path, target),
        Err(_) => {
            let link = fs::read_link(path)
                .with_context(|| format!("reading symlink '{}'", path.display()))?;
            std::os::unix::fs::symlink(anchored(path, &link), target)
                .with_context(|| format!("backing up symlink '{}'", path.display()))
        }
    }
}

/// A link target as seen from `link`'s own directory.
fn anchored(link: &Path, target: &Path) -> PathBuf {
    match link.parent() {
        Some(parent) if target.is_relative() => parent.join(target),
        _ => target.to_path_buf(),
    }
}

/// Deep-copy a directory tree, preserving symlinks.
///
/// Links that resolve inside `src` are copied verbatim. Relative links that
/// leave the tree are made absolute so the copy still points at the same file.
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    let root = fs::canonicalize(src).unwrap_or_else(|_| src.to_path_buf());
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.with_context(|| format!("walking '{}'", src.display()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("relativizing '{}'", entry.path().display()))?;
        let out = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            let stays_inside = fs::canonicalize(entry.path())
                .map(|resolved| resolved.starts_with(&root))
                .unwrap_or(false);
            let link = if stays_inside {
                link
            } else {
                anchored(entry.path(), &link)
            };
            std::os::unix::fs::symlink(&link, &out)
                .with_context(|| format!("copying symlink '{}'", out.display()))?;
        } else if file_type.is_dir() {
            fs::create_dir_all(&out)
                .with_context(|| format!("creating directory '{}'", out.display()))?;
        } else {
            fs::copy(entry.path(), &out)
                .with_context(|| format!("copying '{}'", entry.path().display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_nothing_to_back_up_creates_no_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("backups");
        let mut backups = BackupDir::new(&root);

        let result = backups.backup(&temp.path().join("missing")).unwrap();

        assert!(result.is_none());
        assert!(backups.path().is_none());
        assert!(!root.exists());
    }

    #[test]
    fn test_backup_copies_file_and_keeps_original() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join(".zshrc");
        fs::write(&file, "old").unwrap();
        let mut backups = BackupDir::new(temp.path().join("backups"));

        let copy = backups.backup(&file).unwrap().unwrap();

        assert_eq!(fs::read_to_string(&copy).unwrap(), "old");
        assert_eq!(fs::read_to_string(&file).unwrap(), "old");
        assert_eq!(copy.file_name().unwrap(), ".zshrc");
        assert!(copy.starts_with(backups.path().unwrap()));
    }

    #[test]
    fn test_backups_share_one_directory() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), "1").unwrap();
        fs::write(temp.path().join("b"), "2").unwrap();
        let mut backups = BackupDir::new(temp.path().join("backups"));

        let a = backups.backup(&temp.path().join("a")).unwrap().unwrap();
        let b = backups.backup(&temp.path().join("b")).unwrap().unwrap();

        assert_eq!(a.parent(), b.parent());
        assert_eq!(fs::read_dir(temp.path().join("backups")).unwrap().count(), 1);
    }

    #[test]
    fn test_same_name_last_write_wins() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("config");
        let mut backups = BackupDir::new(temp.path().join("backups"));

        fs::write(&file, "first").unwrap();
        backups.backup(&file).unwrap();
        fs::write(&file, "second").unwrap();
        let copy = backups.backup(&file).unwrap().unwrap();

        assert_eq!(fs::read_to_string(copy).unwrap(), "second");
    }

    #[test]
    fn test_directory_is_deep_copied() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("alacritty");
        fs::create_dir_all(dir.join("themes")).unwrap();
        fs::write(dir.join("themes/dark.toml"), "dark").unwrap();
        std::os::unix::fs::symlink("themes/dark.toml", dir.join("current.toml")).unwrap();
        let mut backups = BackupDir::new(temp.path().join("backups"));

        let copy = backups.backup(&dir).unwrap().unwrap();

        assert_eq!(
            fs::read_to_string(copy.join("themes/dark.toml")).unwrap(),
            "dark"
        );
        assert!(copy.join("current.toml").is_symlink());
        assert!(dir.join("themes/dark.toml").exists());
    }

    #[test]
    fn test_symlinked_file_backs_up_link_target_content() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("dotfiles")).unwrap();
        fs::write(temp.path().join("dotfiles/zshrc"), "old").unwrap();
        let link = temp.path().join(".zshrc");
        std::os::unix::fs::symlink("dotfiles/zshrc", &link).unwrap();
        let mut backups = BackupDir::new(temp.path().join("backups"));

        let copy = backups.backup(&link).unwrap().unwrap();

        assert!(!copy.is_symlink());
        assert_eq!(fs::read_to_string(&copy).unwrap(), "old");
        assert!(link.is_symlink());
    }

    #[test]
    fn test_symlinked_directory_backs_up_contents() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("dotfiles/alacritty")).unwrap();
        fs::write(temp.path().join("dotfiles/alacritty/alacritty.toml"), "old").unwrap();
        let link = temp.path().join("alacritty");
        std::os::unix::fs::symlink("dotfiles/alacritty", &link).unwrap();
        let mut backups = BackupDir::new(temp.path().join("backups"));

        let copy = backups.backup(&link).unwrap().unwrap();

        assert!(copy.is_dir() && !copy.is_symlink());
        assert_eq!(
            fs::read_to_string(copy.join("alacritty.toml")).unwrap(),
            "old"
        );
    }

    #[test]
    fn test_dangling_symlink_keeps_absolute_target() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join(".zshrc");
        std::os::unix::fs::symlink("dotfiles/gone", &link).unwrap();
        let mut backups = BackupDir::new(temp.path().join("backups"));

        let copy = backups.backup(&link).unwrap().unwrap();

        assert_eq!(
            fs::read_link(&copy).unwrap(),
            temp.path().join("dotfiles/gone")
        );
    }

    #[test]
    fn test_tree_link_leaving_the_tree_is_made_absolute() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("shared.toml"), "shared").unwrap();
        let dir = temp.path().join("alacritty");
        fs::create_dir_all(&dir).unwrap();
        std::os::unix::fs::symlink("../shared.toml", dir.join("shared.toml")).unwrap();
        let mut backups = BackupDir::new(temp.path().join("backups"));

        let copy = backups.backup(&dir).unwrap().unwrap();

        assert!(fs::read_link(copy.join("shared.toml")).unwrap().is_absolute());
        assert_eq!(
            fs::read_to_string(copy.join("shared.toml")).unwrap(),
            "shared"
        );
    }

    #[test]
    fn test_existing_timestamp_gets_suffix() {
        let temp = TempDir::new().unwrap();
        let first = unique_timestamped_dir(temp.path()).unwrap();
        fs::create_dir_all(&first).unwrap();

        let second = unique_timestamped_dir(temp.path()).unwrap();

        assert_ne!(first, second);
    }
}

//! Archive extraction.

use crate::process::Cmd;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// Extract a zip archive into `dest`, overwriting existing files.
pub fn unzip(archive: &Path, dest: &Path) -> Result<()> {
    if !archive.is_file() {
        bail!("archive not found: {}", archive.display());
    }
    fs::create_dir_all(dest)
        .with_context(|| format!("creating extraction directory '{}'", dest.display()))?;

    Cmd::new("unzip")
        .args(["-o", "-q"])
        .arg(archive)
        .arg("-d")
        .arg(dest)
        .run()
        .with_context(|| {
            format!(
                "extracting '{}' into '{}'",
                archive.display(),
                dest.display()
            )
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_archive_is_error() {
        let temp = TempDir::new().unwrap();
        let err = unzip(&temp.path().join("nope.zip"), &temp.path().join("out")).unwrap_err();
        assert!(err.to_string().contains("archive not found"));
    }

    #[test]
    fn test_corrupt_archive_is_error() {
        if which::which("unzip").is_err() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bad.zip");
        fs::write(&archive, "not a zip").unwrap();

        assert!(unzip(&archive, &temp.path().join("out")).is_err());
    }

    #[test]
    fn test_extracts_archive() {
        if which::which("unzip").is_err() || which::which("zip").is_err() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("Font-Regular.ttf"), "glyphs").unwrap();
        Cmd::new("zip")
            .args(["-q", "-r", "../font.zip", "."])
            .current_dir(&src)
            .run()
            .unwrap();

        let out = temp.path().join("out");
        unzip(&temp.path().join("font.zip"), &out).unwrap();

        assert_eq!(
            fs::read_to_string(out.join("Font-Regular.ttf")).unwrap(),
            "glyphs"
        );
    }
}

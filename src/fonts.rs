//! Nerd Font installation.
//!
//! The release archive is downloaded into the cache directory (resumable),
//! optionally checked against a pinned SHA-256, then unpacked into
//! `<font dir>/<archive>`. On Linux the caller refreshes the font cache
//! afterwards with [`refresh_font_cache`]; that refresh is advisory.

use crate::config::{Appearance, NetworkConfig};
use crate::fetch::{archive, Downloader};
use crate::layout::Layout;
use crate::process::{Cmd, RetryPolicy};
use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

const NERD_FONTS_RELEASES: &str = "https://github.com/ryanoasis/nerd-fonts/releases/download";

/// What [`install_fonts`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontStatus {
    /// Matching font files were already present.
    AlreadyInstalled,
    /// Archive unpacked into this directory.
    Installed(PathBuf),
}

/// Release URL of the configured archive.
pub fn archive_url(appearance: &Appearance) -> String {
    format!(
        "{}/{}/{}.zip",
        NERD_FONTS_RELEASES, appearance.nerd_fonts_version, appearance.font_archive
    )
}

/// Whether `font_dir` already holds `.ttf`/`.otf` files from `archive`.
///
/// A font counts when its file name starts with the archive name or when it
/// sits under `<font_dir>/<archive>`. Nerd Fonts renames some families
/// (`SourceCodePro` ships `SauceCodePro*`), so the name alone is not enough.
pub fn fonts_installed(font_dir: &Path, archive: &str) -> bool {
    let prefix = archive.to_ascii_lowercase();
    let unpacked = font_dir.join(archive);
    WalkDir::new(font_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .any(|entry| {
            let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
            let is_font = name.ends_with(".ttf") || name.ends_with(".otf");
            is_font && (name.starts_with(&prefix) || entry.path().starts_with(&unpacked))
        })
}

/// Download, verify and unpack the configured Nerd Font.
pub fn install_fonts(
    layout: &Layout,
    appearance: &Appearance,
    network: &NetworkConfig,
    retry: &RetryPolicy,
) -> Result<FontStatus> {
    if fonts_installed(&layout.font_dir, &appearance.font_archive) {
        info!(
            "{} fonts already present in {}",
            appearance.font_archive,
            layout.pretty(&layout.font_dir)
        );
        return Ok(FontStatus::AlreadyInstalled);
    }

    let Some(downloader) = Downloader::detect(layout) else {
        bail!("neither curl nor wget is available to download fonts");
    };
    let url = archive_url(appearance);
    let zip = layout
        .cache_dir
        .join(format!("{}-{}.zip", appearance.font_archive, appearance.nerd_fonts_version));
    downloader.fetch(&url, &zip, network, retry)?;

    if let Some(expected) = &appearance.font_sha256 {
        if let Err(err) = verify_sha256(&zip, expected) {
            // Drop the bad file so the next run does not resume onto it.
            let _ = fs::remove_file(&zip);
            return Err(err);
        }
        info!("verified {}", zip.display());
    }

    let target = layout.font_dir.join(&appearance.font_archive);
    fs::create_dir_all(&target)
        .with_context(|| format!("creating font directory '{}'", target.display()))?;
    archive::unzip(&zip, &target)?;
    info!("installed {} into {}", appearance.font_archive, layout.pretty(&target));
    Ok(FontStatus::Installed(target))
}

/// Rebuild the fontconfig cache so new fonts show up without a re-login.
pub fn refresh_font_cache(layout: &Layout) -> Result<()> {
    let Some(fc_cache) = layout.find_binary("fc-cache") else {
        bail!("fc-cache not found; new fonts appear after the next login");
    };
    Cmd::new(fc_cache).arg("-f").run()?;
    info!("refreshed font cache");
    Ok(())
}

/// Fail unless `path` hashes to `expected` (hex, either case).
pub fn verify_sha256(path: &Path, expected: &str) -> Result<()> {
    let actual = sha256_file(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        bail!(
            "checksum mismatch for '{}': expected {}, got {}",
            path.display(),
            expected.to_ascii_lowercase(),
            actual
        );
    }
    Ok(())
}

fn sha256_file(path: &Path) -> Result<String> {
    let f = File::open(path).with_context(|| format!("opening '{}'", path.display()))?;
    let mut r = BufReader::new(f);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = r
            .read(&mut buf)
            .with_context(|| format!("reading '{}'", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

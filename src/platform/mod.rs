//! Host platform detection.
//!
//! The only genuinely platform-specific behaviour (how packages get
//! installed) sits behind [`provider::PackageProvider`]. Everything else
//! asks [`Platform`] a yes/no question: macOS or Linux, WSL or not.

pub mod provider;

use anyhow::{bail, Context, Result};
use std::fmt;
use std::fs;
use std::path::Path;

pub use provider::{provider_for, PackageProvider};

const OS_RELEASE: &str = "/etc/os-release";
const KERNEL_OSRELEASE: &str = "/proc/sys/kernel/osrelease";

const DEBIAN_IDS: &[&str] = &[
    "debian",
    "ubuntu",
    "linuxmint",
    "pop",
    "raspbian",
    "kali",
    "elementary",
];
const RHEL_IDS: &[&str] = &[
    "rhel", "fedora", "centos", "rocky", "almalinux", "ol", "amzn",
];

/// Supported platform families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    /// macOS with Homebrew.
    MacOs,
    /// Debian, Ubuntu and derivatives (APT).
    Debian,
    /// RHEL, Fedora and derivatives (YUM/DNF).
    Rhel,
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformKind::MacOs => write!(f, "macOS"),
            PlatformKind::Debian => write!(f, "Debian"),
            PlatformKind::Rhel => write!(f, "RHEL"),
        }
    }
}

/// Detected host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub kind: PlatformKind,
    /// Distribution id from os-release (`macos` on macOS).
    pub distro_id: String,
    /// Running inside Windows Subsystem for Linux.
    pub wsl: bool,
}

impl Platform {
    /// Detect the running host.
    pub fn detect() -> Result<Self> {
        match std::env::consts::OS {
            "macos" => Ok(Self {
                kind: PlatformKind::MacOs,
                distro_id: "macos".to_string(),
                wsl: false,
            }),
            "linux" => {
                let raw = fs::read_to_string(OS_RELEASE)
                    .with_context(|| format!("reading '{OS_RELEASE}'"))?;
                let mut platform = parse_os_release(&raw)?;
                platform.wsl = detect_wsl(Path::new(KERNEL_OSRELEASE));
                Ok(platform)
            }
            other => bail!("unsupported operating system '{other}'"),
        }
    }

    pub fn is_macos(&self) -> bool {
        self.kind == PlatformKind::MacOs
    }

    pub fn is_linux(&self) -> bool {
        !self.is_macos()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.distro_id)?;
        if self.wsl {
            write!(f, " under WSL")?;
        }
        Ok(())
    }
}

/// Classify a Linux host from `/etc/os-release` content.
///
/// `ID` is checked first, then each entry of `ID_LIKE`.
pub fn parse_os_release(raw: &str) -> Result<Platform> {
    let mut id = None;
    let mut id_like = Vec::new();

    for line in raw.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        match key.trim() {
            "ID" => id = Some(value.to_ascii_lowercase()),
            "ID_LIKE" => {
                id_like = value
                    .split_whitespace()
                    .map(|s| s.to_ascii_lowercase())
                    .collect()
            }
            _ => {}
        }
    }

    let id = id.context("os-release has no ID field")?;
    let kind = std::iter::once(id.as_str())
        .chain(id_like.iter().map(String::as_str))
        .find_map(classify)
        .with_context(|| {
            format!(
                "unsupported Linux distribution '{}' (ID_LIKE: {}); supported: Debian or RHEL families",
                id,
                if id_like.is_empty() {
                    "none".to_string()
                } else {
                    id_like.join(" ")
                }
            )
        })?;

    Ok(Platform {
        kind,
        distro_id: id,
        wsl: false,
    })
}

fn classify(id: &str) -> Option<PlatformKind> {
    if DEBIAN_IDS.contains(&id) {
        Some(PlatformKind::Debian)
    } else if RHEL_IDS.contains(&id) {
        Some(PlatformKind::Rhel)
    } else {
        None
    }
}

fn detect_wsl(osrelease: &Path) -> bool {
    fs::read_to_string(osrelease)
        .map(|s| s.to_ascii_lowercase().contains("microsoft"))
        .unwrap_or(false)
}

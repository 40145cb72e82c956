//! Package providers: one per supported platform family.
//!
//! A provider is selected once at startup with [`provider_for`] and used
//! through the uniform [`PackageProvider::install_package`] call. Installs
//! run through the retry executor; package managers that need root are
//! prefixed with `sudo` when the run is unprivileged.

use super::PlatformKind;
use crate::config::NetworkConfig;
use crate::fetch::Downloader;
use crate::layout::Layout;
use crate::process::{Cmd, RetryPolicy};
use anyhow::{bail, Context, Result};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;
use tracing::info;

/// Homebrew install locations checked when `brew` is not on PATH.
pub const BREW_PREFIXES: &[&str] = &["/opt/homebrew/bin/brew", "/usr/local/bin/brew"];

/// Official Homebrew installer.
pub const HOMEBREW_INSTALL_URL: &str =
    "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh";

/// Uniform package installation interface.
pub trait PackageProvider {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Platform family this provider serves; selects per-tool package names.
    fn kind(&self) -> PlatformKind;

    /// Refresh the package index. Providers without one do nothing.
    fn refresh_index(&self) -> Result<()> {
        Ok(())
    }

    /// Install one package by name.
    fn install_package(&self, name: &str) -> Result<()>;
}

/// Select the provider for a platform family.
pub fn provider_for(
    kind: PlatformKind,
    network: &NetworkConfig,
    retry: RetryPolicy,
) -> Result<Box<dyn PackageProvider>> {
    let elevation = Elevation::detect(network);
    Ok(match kind {
        PlatformKind::MacOs => {
            let Some(brew) = locate_brew() else {
                bail!("Homebrew not found (looked on PATH and in {})", BREW_PREFIXES.join(", "));
            };
            Box::new(Homebrew {
                brew,
                network: network.clone(),
                retry,
            })
        }
        PlatformKind::Debian => Box::new(Apt { elevation, retry }),
        PlatformKind::Rhel => {
            let program = if which::which("dnf").is_ok() { "dnf" } else { "yum" };
            Box::new(Yum {
                program,
                elevation,
                retry,
            })
        }
    })
}

/// Find the `brew` executable.
pub fn locate_brew() -> Option<PathBuf> {
    which::which("brew").ok().or_else(|| {
        BREW_PREFIXES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_file())
    })
}

/// Install Homebrew with its official script unless `brew` already exists.
///
/// Returns the `brew` executable.
pub fn ensure_homebrew(
    layout: &Layout,
    network: &NetworkConfig,
    retry: &RetryPolicy,
) -> Result<PathBuf> {
    if let Some(brew) = locate_brew() {
        return Ok(brew);
    }
    let Some(downloader) = Downloader::detect(layout) else {
        bail!("neither curl nor wget is available to fetch the Homebrew installer");
    };
    let script = layout.cache_dir.join("homebrew-install.sh");
    if script.exists() {
        fs::remove_file(&script)
            .with_context(|| format!("removing stale '{}'", script.display()))?;
    }
    downloader.fetch(HOMEBREW_INSTALL_URL, &script, network, retry)?;

    info!("installing Homebrew");
    Cmd::new("bash")
        .arg(&script)
        .env("NONINTERACTIVE", "1")
        .envs(network.proxy_env())
        .run_with_retry(retry)
        .into_result("Homebrew installer")?;

    locate_brew().with_context(|| {
        format!(
            "Homebrew installer finished but brew is not in {}",
            BREW_PREFIXES.join(" or ")
        )
    })
}

/// How to run a command as root.
#[derive(Debug, Clone)]
struct Elevation {
    sudo: bool,
    env: Vec<(&'static str, String)>,
}

impl Elevation {
    fn detect(network: &NetworkConfig) -> Self {
        Self::new(!is_root(), network)
    }

    fn new(sudo: bool, network: &NetworkConfig) -> Self {
        Self {
            sudo,
            env: network.proxy_env(),
        }
    }

    /// Build `program` with `env`, behind `sudo VAR=value ...` when needed.
    ///
    /// sudo resets the environment, so variables travel as assignments on
    /// its command line instead.
    fn command(&self, program: &str, extra_env: &[(&'static str, &str)]) -> Cmd {
        let vars = self
            .env
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .chain(extra_env.iter().copied());
        if self.sudo {
            Cmd::new("sudo")
                .args(vars.map(|(k, v)| format!("{k}={v}")))
                .arg(program)
        } else {
            Cmd::new(program).envs(vars)
        }
    }
}

/// `/proc/self` is owned by the effective uid of the reading process.
fn is_root() -> bool {
    fs::metadata("/proc/self")
        .map(|meta| meta.uid() == 0)
        .unwrap_or(false)
}

/// macOS Homebrew.
pub struct Homebrew {
    brew: PathBuf,
    network: NetworkConfig,
    retry: RetryPolicy,
}

impl PackageProvider for Homebrew {
    fn name(&self) -> &str {
        "homebrew"
    }

    fn kind(&self) -> PlatformKind {
        PlatformKind::MacOs
    }

    fn install_package(&self, name: &str) -> Result<()> {
        info!("brew install {name}");
        Cmd::new(&self.brew)
            .args(["install", name])
            .env("HOMEBREW_NO_AUTO_UPDATE", "1")
            .envs(self.network.proxy_env())
            .run_with_retry(&self.retry)
            .into_result(&format!("brew install {name}"))
    }
}

/// Debian family APT.
struct Apt {
    elevation: Elevation,
    retry: RetryPolicy,
}

impl Apt {
    fn apt_get(&self) -> Cmd {
        self.elevation
            .command("apt-get", &[("DEBIAN_FRONTEND", "noninteractive")])
    }
}

impl PackageProvider for Apt {
    fn name(&self) -> &str {
        "apt"
    }

    fn kind(&self) -> PlatformKind {
        PlatformKind::Debian
    }

    fn refresh_index(&self) -> Result<()> {
        self.apt_get()
            .arg("update")
            .run_with_retry(&self.retry)
            .into_result("apt-get update")
    }

    fn install_package(&self, name: &str) -> Result<()> {
        info!("apt-get install {name}");
        self.apt_get()
            .args(["install", "-y", "--no-install-recommends", name])
            .run_with_retry(&self.retry)
            .into_result(&format!("apt-get install {name}"))
    }
}

/// RHEL family YUM, or DNF where available.
struct Yum {
    program: &'static str,
    elevation: Elevation,
    retry: RetryPolicy,
}

impl PackageProvider for Yum {
    fn name(&self) -> &str {
        self.program
    }

    fn kind(&self) -> PlatformKind {
        PlatformKind::Rhel
    }

    fn refresh_index(&self) -> Result<()> {
        self.elevation
            .command(self.program, &[])
            .arg("makecache")
            .run_with_retry(&self.retry)
            .into_result(&format!("{} makecache", self.program))
    }

    fn install_package(&self, name: &str) -> Result<()> {
        info!("{} install {name}", self.program);
        self.elevation
            .command(self.program, &[])
            .args(["install", "-y", name])
            .run_with_retry(&self.retry)
            .into_result(&format!("{} install {name}", self.program))
    }
}

//! User configuration.
//!
//! Everything is optional: with no file the run uses the defaults below.
//! The file lives at `<config dir>/devshell-bootstrap/config.toml` unless a
//! path is given on the command line.

use crate::process::RetryPolicy;
use crate::templates::ColorScheme;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "config.toml";
pub const APP_DIR: &str = "devshell-bootstrap";

pub const DEFAULT_FONT_FAMILY: &str = "JetBrainsMono Nerd Font";
pub const DEFAULT_FONT_ARCHIVE: &str = "JetBrainsMono";
pub const DEFAULT_FONT_SIZE: f32 = 13.0;
pub const DEFAULT_NERD_FONTS_VERSION: &str = "v3.2.1";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Resolved run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapConfig {
    pub appearance: Appearance,
    pub network: NetworkConfig,
    pub retry: RetryPolicy,
    pub install: InstallOptions,
    /// Extra legacy paths, relative to `$HOME`, to back up and remove.
    pub cleanup_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Appearance {
    pub font_family: String,
    pub font_archive: String,
    pub font_size: f32,
    pub color_scheme: ColorScheme,
    pub nerd_fonts_version: String,
    pub font_sha256: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    pub skip_fonts: bool,
    pub skip_optional: bool,
    pub change_shell: bool,
}

/// Network settings handed to every collaborator that talks to the network.
///
/// The process environment is never modified; collaborators receive these
/// values as per-invocation variables or flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub proxy: Option<String>,
    pub no_proxy: Option<String>,
    pub connect_timeout_secs: u64,
}

impl NetworkConfig {
    /// Proxy variables in both spellings, for child processes.
    pub fn proxy_env(&self) -> Vec<(&'static str, String)> {
        let mut vars = Vec::new();
        if let Some(proxy) = &self.proxy {
            for key in ["http_proxy", "https_proxy", "HTTP_PROXY", "HTTPS_PROXY"] {
                vars.push((key, proxy.clone()));
            }
        }
        if let Some(no_proxy) = &self.no_proxy {
            for key in ["no_proxy", "NO_PROXY"] {
                vars.push((key, no_proxy.clone()));
            }
        }
        vars
    }

    /// Proxy inherited from the invoking shell, if any.
    fn from_inherited_env() -> Self {
        let lookup = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| std::env::var(k).ok())
                .find(|v| !v.trim().is_empty())
        };
        Self {
            proxy: lookup(&["https_proxy", "HTTPS_PROXY", "http_proxy", "HTTP_PROXY"]),
            no_proxy: lookup(&["no_proxy", "NO_PROXY"]),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            appearance: Appearance {
                font_family: DEFAULT_FONT_FAMILY.to_string(),
                font_archive: DEFAULT_FONT_ARCHIVE.to_string(),
                font_size: DEFAULT_FONT_SIZE,
                color_scheme: ColorScheme::default(),
                nerd_fonts_version: DEFAULT_NERD_FONTS_VERSION.to_string(),
                font_sha256: None,
            },
            network: NetworkConfig {
                proxy: None,
                no_proxy: None,
                connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            retry: RetryPolicy::default(),
            install: InstallOptions {
                skip_fonts: false,
                skip_optional: false,
                change_shell: true,
            },
            cleanup_paths: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    #[serde(default)]
    appearance: AppearanceToml,
    #[serde(default)]
    network: NetworkToml,
    #[serde(default)]
    retry: RetryToml,
    #[serde(default)]
    install: InstallToml,
    #[serde(default)]
    cleanup: CleanupToml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AppearanceToml {
    font_family: Option<String>,
    font_archive: Option<String>,
    font_size: Option<f32>,
    color_scheme: Option<ColorScheme>,
    nerd_fonts_version: Option<String>,
    font_sha256: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NetworkToml {
    proxy: Option<String>,
    no_proxy: Option<String>,
    connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RetryToml {
    attempts: Option<u32>,
    delay_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstallToml {
    skip_fonts: Option<bool>,
    skip_optional: Option<bool>,
    change_shell: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CleanupToml {
    #[serde(default)]
    extra_paths: Vec<String>,
}

/// Default config file location, if a config dir exists on this host.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

impl BootstrapConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used when present. The inherited proxy environment fills in network
    /// values the file leaves unset.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    bail!("config file not found: '{}'", path.display());
                }
                Some(path.to_path_buf())
            }
            None => default_config_path().filter(|p| p.is_file()),
        };

        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(&path)
                    .with_context(|| format!("reading config '{}'", path.display()))?;
                Self::parse(&raw)
                    .with_context(|| format!("parsing config '{}'", path.display()))?
            }
            None => Self::default(),
        };

        let inherited = NetworkConfig::from_inherited_env();
        if config.network.proxy.is_none() {
            config.network.proxy = inherited.proxy;
        }
        if config.network.no_proxy.is_none() {
            config.network.no_proxy = inherited.no_proxy;
        }
        Ok(config)
    }

    /// Parse and validate TOML content on top of the defaults.
    pub fn parse(raw: &str) -> Result<Self> {
        let parsed: ConfigToml = toml::from_str(raw)?;
        let defaults = Self::default();

        let appearance = Appearance {
            font_family: parsed
                .appearance
                .font_family
                .unwrap_or(defaults.appearance.font_family),
            font_archive: parsed
                .appearance
                .font_archive
                .unwrap_or(defaults.appearance.font_archive),
            font_size: parsed
                .appearance
                .font_size
                .unwrap_or(defaults.appearance.font_size),
            color_scheme: parsed
                .appearance
                .color_scheme
                .unwrap_or(defaults.appearance.color_scheme),
            nerd_fonts_version: parsed
                .appearance
                .nerd_fonts_version
                .unwrap_or(defaults.appearance.nerd_fonts_version),
            font_sha256: parsed
                .appearance
                .font_sha256
                .map(|s| s.trim().to_ascii_lowercase()),
        };
        if !(appearance.font_size > 0.0) {
            bail!("appearance.font_size must be positive, got {}", appearance.font_size);
        }
        if appearance.font_archive.trim().is_empty()
            || appearance.font_archive.contains('/')
        {
            bail!(
                "appearance.font_archive must be a bare archive name, got '{}'",
                appearance.font_archive
            );
        }
        if let Some(sha) = &appearance.font_sha256 {
            if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
                bail!("appearance.font_sha256 must be 64 hex characters");
            }
        }

        let attempts = parsed.retry.attempts.unwrap_or(defaults.retry.attempts());
        if attempts == 0 {
            bail!("retry.attempts must be at least 1");
        }
        let delay = parsed
            .retry
            .delay_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.retry.delay());

        let cleanup_paths = parsed
            .cleanup
            .extra_paths
            .iter()
            .map(|raw| parse_home_relative(raw, "cleanup.extra_paths"))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            appearance,
            network: NetworkConfig {
                proxy: parsed.network.proxy.filter(|p| !p.trim().is_empty()),
                no_proxy: parsed.network.no_proxy.filter(|p| !p.trim().is_empty()),
                connect_timeout_secs: parsed
                    .network
                    .connect_timeout_secs
                    .unwrap_or(defaults.network.connect_timeout_secs),
            },
            retry: RetryPolicy::new(attempts, delay),
            install: InstallOptions {
                skip_fonts: parsed
                    .install
                    .skip_fonts
                    .unwrap_or(defaults.install.skip_fonts),
                skip_optional: parsed
                    .install
                    .skip_optional
                    .unwrap_or(defaults.install.skip_optional),
                change_shell: parsed
                    .install
                    .change_shell
                    .unwrap_or(defaults.install.change_shell),
            },
            cleanup_paths,
        })
    }
}

fn parse_home_relative(raw: &str, field: &str) -> Result<PathBuf> {
    let candidate = Path::new(raw.trim());
    if candidate.as_os_str().is_empty() {
        bail!("{field} contains an empty path");
    }
    if candidate.is_absolute() {
        bail!("{field} must be relative to $HOME, got absolute path '{}'", raw);
    }
    for component in candidate.components() {
        if matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        ) {
            bail!("{field} contains invalid traversal component in '{}'", raw);
        }
    }
    Ok(candidate.to_path_buf())
}

//! Config artifact renderers.
//!
//! Each artifact is a pure function of [`Settings`]: no filesystem access,
//! no environment lookups. [`Settings::resolve`] gathers everything from the
//! host once, before rendering.

mod alacritty;
mod starship;
mod zshrc;

use crate::config::BootstrapConfig;
use crate::layout::Layout;
use crate::platform::provider::locate_brew;
use crate::platform::Platform;
use anyhow::{bail, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Marker written at the top of every generated file.
pub const GENERATED_BY: &str = "Generated by devshell-bootstrap";

/// Color schemes shared by the prompt and terminal configs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorScheme {
    #[default]
    TokyoNight,
    GruvboxDark,
    CatppuccinMocha,
}

/// Terminal palette. Color arrays are ordered black, red, green, yellow,
/// blue, magenta, cyan, white.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub foreground: &'static str,
    pub normal: [&'static str; 8],
    pub bright: [&'static str; 8],
}

pub const COLOR_NAMES: [&str; 8] = [
    "black", "red", "green", "yellow", "blue", "magenta", "cyan", "white",
];

impl ColorScheme {
    pub fn name(&self) -> &'static str {
        match self {
            ColorScheme::TokyoNight => "tokyo-night",
            ColorScheme::GruvboxDark => "gruvbox-dark",
            ColorScheme::CatppuccinMocha => "catppuccin-mocha",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            ColorScheme::TokyoNight => Palette {
                background: "#1a1b26",
                foreground: "#c0caf5",
                normal: [
                    "#15161e", "#f7768e", "#9ece6a", "#e0af68", "#7aa2f7", "#bb9af7", "#7dcfff",
                    "#a9b1d6",
                ],
                bright: [
                    "#414868", "#f7768e", "#9ece6a", "#e0af68", "#7aa2f7", "#bb9af7", "#7dcfff",
                    "#c0caf5",
                ],
            },
            ColorScheme::GruvboxDark => Palette {
                background: "#282828",
                foreground: "#ebdbb2",
                normal: [
                    "#282828", "#cc241d", "#98971a", "#d79921", "#458588", "#b16286", "#689d6a",
                    "#a89984",
                ],
                bright: [
                    "#928374", "#fb4934", "#b8bb26", "#fabd2f", "#83a598", "#d3869b", "#8ec07c",
                    "#ebdbb2",
                ],
            },
            ColorScheme::CatppuccinMocha => Palette {
                background: "#1e1e2e",
                foreground: "#cdd6f4",
                normal: [
                    "#45475a", "#f38ba8", "#a6e3a1", "#f9e2af", "#89b4fa", "#f5c2e7", "#94e2d5",
                    "#bac2de",
                ],
                bright: [
                    "#585b70", "#f38ba8", "#a6e3a1", "#f9e2af", "#89b4fa", "#f5c2e7", "#94e2d5",
                    "#a6adc8",
                ],
            },
        }
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything the templates render from.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub home: PathBuf,
    pub local_bin: PathBuf,
    pub plugin_dir: PathBuf,
    pub font_family: String,
    pub font_size: f32,
    pub color_scheme: ColorScheme,
    pub macos: bool,
    /// `brew` executable for `shellenv` on macOS.
    pub brew: Option<PathBuf>,
    /// `eza` resolved; enables the listing aliases.
    pub eza: bool,
    /// `bat` or `batcat`, whichever resolved.
    pub bat_command: Option<String>,
    pub proxy: Option<String>,
    pub no_proxy: Option<String>,
}

impl Settings {
    /// Gather settings from the host. Call after tool installation so the
    /// optional aliases reflect what is actually present.
    pub fn resolve(layout: &Layout, platform: &Platform, config: &BootstrapConfig) -> Self {
        let bat_command = ["bat", "batcat"]
            .into_iter()
            .find(|name| layout.find_binary(name).is_some())
            .map(String::from);
        Self {
            home: layout.home.clone(),
            local_bin: layout.local_bin.clone(),
            plugin_dir: layout.plugin_dir(),
            font_family: config.appearance.font_family.clone(),
            font_size: config.appearance.font_size,
            color_scheme: config.appearance.color_scheme,
            macos: platform.is_macos(),
            brew: if platform.is_macos() { locate_brew() } else { None },
            eza: layout.find_binary("eza").is_some(),
            bat_command,
            proxy: config.network.proxy.clone(),
            no_proxy: config.network.no_proxy.clone(),
        }
    }

    /// `path` as a shell word, using `$HOME` where possible.
    pub(crate) fn shell_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.home) {
            Ok(rel) if rel.as_os_str().is_empty() => "$HOME".to_string(),
            Ok(rel) => format!("$HOME/{}", rel.display()),
            Err(_) => path.display().to_string(),
        }
    }
}

/// The three generated config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigArtifact {
    ShellProfile,
    PromptConfig,
    TerminalConfig,
}

impl ConfigArtifact {
    pub const ALL: [ConfigArtifact; 3] = [
        ConfigArtifact::ShellProfile,
        ConfigArtifact::PromptConfig,
        ConfigArtifact::TerminalConfig,
    ];

    /// Short name used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigArtifact::ShellProfile => "zshrc",
            ConfigArtifact::PromptConfig => "starship",
            ConfigArtifact::TerminalConfig => "alacritty",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "zshrc" | "zsh" | "shell" => Ok(ConfigArtifact::ShellProfile),
            "starship" | "prompt" => Ok(ConfigArtifact::PromptConfig),
            "alacritty" | "terminal" => Ok(ConfigArtifact::TerminalConfig),
            other => bail!(
                "unknown artifact '{}'; expected one of: {}",
                other,
                Self::ALL.map(|a| a.name()).join(", ")
            ),
        }
    }

    pub fn destination(&self, layout: &Layout) -> PathBuf {
        match self {
            ConfigArtifact::ShellProfile => layout.home.join(".zshrc"),
            ConfigArtifact::PromptConfig => layout.config_dir.join("starship.toml"),
            ConfigArtifact::TerminalConfig => layout.config_dir.join("alacritty/alacritty.toml"),
        }
    }

    pub fn render(&self, settings: &Settings) -> String {
        match self {
            ConfigArtifact::ShellProfile => zshrc::render(settings),
            ConfigArtifact::PromptConfig => starship::render(settings),
            ConfigArtifact::TerminalConfig => alacritty::render(settings),
        }
    }
}

impl fmt::Display for ConfigArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Quote a value as a TOML basic string.
pub(crate) fn toml_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Quote a value for POSIX shells.
pub(crate) fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

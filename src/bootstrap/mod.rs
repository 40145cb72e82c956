//! The full bootstrap run.
//!
//! Steps run in a fixed order and each is either fatal (the error is
//! returned with context) or advisory (logged at `warn!` through
//! [`Bootstrap::advisory`] and counted in the summary):
//!
//! ```text
//! package manager ─> index refresh* ─> preflight ─> tools ─> zsh plugins
//!     ─> fonts ─> legacy cleanup* ─> configs ─> WSL sync* ─> login shell*
//! ```
//!
//! `*` marks advisory steps. Optional tools, optional collaborators, plugin
//! updates and the font cache refresh are advisory inside otherwise fatal
//! steps.
//!
//! # Example
//!
//! ```rust,ignore
//! use devshell_bootstrap::bootstrap::Bootstrap;
//! use devshell_bootstrap::config::BootstrapConfig;
//!
//! let config = BootstrapConfig::load(None)?;
//! let summary = Bootstrap::detect(config)?.run()?;
//! summary.log();
//! ```

pub mod cleanup;
pub mod shell;
pub mod sync;

use crate::backup::BackupDir;
use crate::config::BootstrapConfig;
use crate::fetch::{ensure_repo, RepoState};
use crate::fonts::{self, FontStatus};
use crate::layout::Layout;
use crate::platform::provider::ensure_homebrew;
use crate::platform::{provider_for, PackageProvider, Platform};
use crate::preflight;
use crate::templates::{ConfigArtifact, Settings};
use crate::tools::{Installer, Necessity, ToolStatus, TOOLS, ZSH_PLUGINS};
use crate::writer::ConfigWriter;
use anyhow::{Context, Result};
use shell::ShellChange;
use std::path::PathBuf;
use tracing::{info, warn};

/// What a run did, for the closing report.
#[derive(Debug, Default)]
pub struct Summary {
    pub platform: String,
    /// Tools installed during this run.
    pub installed: Vec<String>,
    /// Tools that were already present.
    pub present: Vec<String>,
    /// Optional tools skipped or failed.
    pub skipped: Vec<String>,
    pub plugins: Vec<(String, RepoState)>,
    pub fonts: Option<FontStatus>,
    pub removed: Vec<PathBuf>,
    pub written: Vec<PathBuf>,
    pub shell: Option<ShellChange>,
    /// Advisory steps that failed.
    pub warnings: Vec<String>,
    pub backup_dir: Option<PathBuf>,
    pub windows_backup_dir: Option<PathBuf>,
}

impl Summary {
    /// Log the report at `info!`.
    pub fn log(&self) {
        info!("bootstrap complete on {}", self.platform);
        if !self.installed.is_empty() {
            info!("installed: {}", self.installed.join(", "));
        }
        if !self.present.is_empty() {
            info!("already present: {}", self.present.join(", "));
        }
        if !self.skipped.is_empty() {
            info!("skipped optional: {}", self.skipped.join(", "));
        }
        for (name, state) in &self.plugins {
            info!("plugin {name}: {state:?}");
        }
        match &self.fonts {
            Some(FontStatus::Installed(dir)) => info!("fonts installed into {}", dir.display()),
            Some(FontStatus::AlreadyInstalled) => info!("fonts already installed"),
            None => info!("fonts skipped"),
        }
        for path in &self.removed {
            info!("removed legacy {}", path.display());
        }
        for path in &self.written {
            info!("wrote {}", path.display());
        }
        match &self.shell {
            Some(ShellChange::Changed(zsh)) => {
                info!("login shell is now {}; log out and back in", zsh.display())
            }
            Some(ShellChange::AlreadyZsh) => info!("login shell already zsh"),
            Some(ShellChange::Disabled) | None => {}
        }
        match &self.backup_dir {
            Some(dir) => info!("previous files backed up to {}", dir.display()),
            None => info!("nothing needed backing up"),
        }
        if let Some(dir) = &self.windows_backup_dir {
            info!("previous Windows files backed up to {}", dir.display());
        }
        if !self.warnings.is_empty() {
            warn!("{} step(s) finished with warnings:", self.warnings.len());
            for warning in &self.warnings {
                warn!("  {warning}");
            }
        }
    }
}

/// One bootstrap run over a detected host.
pub struct Bootstrap {
    platform: Platform,
    layout: Layout,
    config: BootstrapConfig,
    writer: ConfigWriter,
    summary: Summary,
}

impl Bootstrap {
    pub fn new(platform: Platform, layout: Layout, config: BootstrapConfig) -> Self {
        let writer = ConfigWriter::new(BackupDir::new(&layout.backup_root));
        let summary = Summary {
            platform: platform.to_string(),
            ..Summary::default()
        };
        Self {
            platform,
            layout,
            config,
            writer,
            summary,
        }
    }

    /// Detect the platform and layout of the running host.
    pub fn detect(config: BootstrapConfig) -> Result<Self> {
        let platform = Platform::detect().context("detecting platform")?;
        let layout = Layout::detect(&platform)?;
        Ok(Self::new(platform, layout, config))
    }

    pub fn run(mut self) -> Result<Summary> {
        info!("bootstrapping {}", self.platform);
        let network = self.config.network.clone();
        let retry = self.config.retry;

        if self.platform.is_macos() {
            ensure_homebrew(&self.layout, &network, &retry).context("installing Homebrew")?;
        }
        let provider = provider_for(self.platform.kind, &network, retry)?;
        info!("using {} for packages", provider.name());
        let refreshed = provider.refresh_index();
        self.advisory("refreshing package index", refreshed);

        let layout = self.layout.clone();
        let installer = Installer {
            provider: provider.as_ref(),
            layout: &layout,
            network: &network,
            retry,
        };
        for err in preflight::ensure_collaborators(&installer, &self.platform)? {
            self.advisory::<()>("preflight", Err(err));
        }
        self.install_tools(&installer)?;
        self.install_plugins()?;

        if self.config.install.skip_fonts {
            info!("skipping fonts");
        } else {
            let status = fonts::install_fonts(
                &self.layout,
                &self.config.appearance,
                &network,
                &retry,
            )
            .context("installing fonts")?;
            if matches!(status, FontStatus::Installed(_)) {
                self.refresh_font_cache();
            }
            self.summary.fonts = Some(status);
        }

        self.remove_legacy();
        let terminal_config = self.write_configs()?;

        if self.platform.wsl {
            let synced = self.sync_windows(&terminal_config);
            self.advisory("syncing terminal config to Windows", synced);
        }

        let changed = shell::change_login_shell(&self.layout, self.config.install.change_shell);
        self.summary.shell = self.advisory("changing login shell", changed);

        self.summary.backup_dir = self.writer.backups().path().map(PathBuf::from);
        Ok(self.summary)
    }

    /// Log and record a failed advisory step; the run continues.
    fn advisory<T>(&mut self, step: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("{step}: {err:#}");
                self.summary.warnings.push(format!("{step}: {err:#}"));
                None
            }
        }
    }

    fn install_tools(&mut self, installer: &Installer<'_>) -> Result<()> {
        for tool in TOOLS {
            if tool.necessity == Necessity::Optional && self.config.install.skip_optional {
                info!("skipping optional {}", tool.name);
                self.summary.skipped.push(tool.name.to_string());
                continue;
            }
            match installer.ensure(tool) {
                Ok(ToolStatus::Installed(_)) => self.summary.installed.push(tool.name.to_string()),
                Ok(ToolStatus::AlreadyPresent(_)) => {
                    self.summary.present.push(tool.name.to_string())
                }
                Err(err) if tool.necessity == Necessity::Required => return Err(err),
                Err(err) => {
                    self.summary.skipped.push(tool.name.to_string());
                    self.advisory::<()>(&format!("optional tool {}", tool.name), Err(err));
                }
            }
        }
        Ok(())
    }

    fn refresh_font_cache(&mut self) {
        if self.platform.is_linux() {
            let refreshed = fonts::refresh_font_cache(&self.layout);
            self.advisory("refreshing font cache", refreshed);
        }
    }

    fn install_plugins(&mut self) -> Result<()> {
        let dir = self.layout.plugin_dir();
        for plugin in ZSH_PLUGINS {
            let state = ensure_repo(
                plugin.url,
                &dir.join(plugin.name),
                &self.config.network,
                &self.config.retry,
                self.writer.backups_mut(),
            )
            .with_context(|| format!("installing zsh plugin {}", plugin.name))?;
            if state == RepoState::Stale {
                self.summary
                    .warnings
                    .push(format!("zsh plugin {}: update failed", plugin.name));
            }
            self.summary.plugins.push((plugin.name.to_string(), state));
        }
        Ok(())
    }

    fn remove_legacy(&mut self) {
        for path in cleanup::legacy_paths(&self.layout, &self.config.cleanup_paths) {
            let removed = cleanup::remove_legacy(&path, self.writer.backups_mut());
            if let Some(Some(_)) = self.advisory("removing legacy path", removed) {
                self.summary.removed.push(path);
            }
        }
    }

    /// Write all artifacts; returns the rendered terminal config.
    fn write_configs(&mut self) -> Result<String> {
        let settings = Settings::resolve(&self.layout, &self.platform, &self.config);
        let mut terminal_config = String::new();
        for artifact in ConfigArtifact::ALL {
            let content = artifact.render(&settings);
            let outcome = self
                .writer
                .write_str(&artifact.destination(&self.layout), &content)
                .with_context(|| format!("writing {artifact} config"))?;
            self.summary.written.push(outcome.destination);
            if artifact == ConfigArtifact::TerminalConfig {
                terminal_config = content;
            }
        }
        Ok(terminal_config)
    }

    /// Windows-side files get their own backup directory so their backups
    /// do not replace the Linux copies of the same name.
    fn sync_windows(&mut self, content: &str) -> Result<()> {
        let appdata = sync::windows_appdata()?;
        let backups = BackupDir::new(self.layout.backup_root.join("windows"));
        let mut writer = ConfigWriter::new(backups);
        let outcome = sync::sync_terminal_config(&mut writer, &appdata, content)?;
        self.summary.written.push(outcome.destination);
        self.summary.windows_backup_dir = writer.backups().path().map(PathBuf::from);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::platform::PlatformKind;
    use crate::process::RetryPolicy;
    use crate::tools::testing::{executable, network, platform, setup, setup_failing, FakeProvider};
    use std::ffi::OsString;
    use std::fs;
    use tempfile::TempDir;

    fn bootstrap(home: &std::path::Path) -> Bootstrap {
        let platform = Platform {
            kind: PlatformKind::Debian,
            distro_id: "ubuntu".into(),
            wsl: false,
        };
        let layout = Layout::from_home(home.to_path_buf(), &platform, OsString::new());
        Bootstrap::new(platform, layout, BootstrapConfig::default())
    }

    #[test]
    fn test_write_configs_installs_all_artifacts() {
        let temp = TempDir::new().unwrap();
        let mut run = bootstrap(temp.path());

        let terminal = run.write_configs().unwrap();

        assert!(temp.path().join(".zshrc").is_file());
        assert!(temp.path().join(".config/starship.toml").is_file());
        let alacritty = temp.path().join(".config/alacritty/alacritty.toml");
        assert_eq!(fs::read_to_string(alacritty).unwrap(), terminal);
        assert_eq!(run.summary.written.len(), 3);
        assert!(run.writer.backups().path().is_none());
    }

    #[test]
    fn test_rerun_backs_up_previous_configs() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".zshrc"), "# mine\n").unwrap();

        let mut run = bootstrap(temp.path());
        run.write_configs().unwrap();

        let backup_dir = run.writer.backups().path().unwrap().to_path_buf();
        assert!(backup_dir.starts_with(temp.path().join(".devshell-bootstrap-backups")));
        assert_eq!(
            fs::read_to_string(backup_dir.join(".zshrc")).unwrap(),
            "# mine\n"
        );
    }

    #[test]
    fn test_legacy_cleanup_uses_run_backup_dir() {
        let temp = TempDir::new().unwrap();
        let legacy = temp.path().join(".config/alacritty/alacritty.yml");
        fs::create_dir_all(legacy.parent().unwrap()).unwrap();
        fs::write(&legacy, "font: {}\n").unwrap();

        let mut run = bootstrap(temp.path());
        run.remove_legacy();

        assert!(!legacy.exists());
        assert_eq!(run.summary.removed, vec![legacy]);
        let backup = run.writer.backups().path().unwrap().join("alacritty.yml");
        assert!(backup.is_file());
        assert!(run.summary.warnings.is_empty());
    }

    #[test]
    fn test_advisory_records_warning_and_continues() {
        let temp = TempDir::new().unwrap();
        let mut run = bootstrap(temp.path());

        let value: Option<()> =
            run.advisory("changing login shell", Err(anyhow::anyhow!("denied")));

        assert!(value.is_none());
        assert_eq!(run.summary.warnings, vec!["changing login shell: denied"]);
        assert_eq!(run.advisory("ok step", Ok(5)), Some(5));
    }

    fn installer<'a>(
        provider: &'a FakeProvider,
        layout: &'a Layout,
        network: &'a NetworkConfig,
    ) -> Installer<'a> {
        Installer {
            provider,
            layout,
            network,
            retry: RetryPolicy::once(),
        }
    }

    fn bootstrap_for(layout: &Layout, config: BootstrapConfig) -> Bootstrap {
        Bootstrap::new(platform(PlatformKind::Debian), layout.clone(), config)
    }

    #[test]
    fn test_required_tool_failure_aborts() {
        let (_temp, layout, provider) = setup(PlatformKind::Debian, true);
        let net = network();
        let mut run = bootstrap_for(&layout, BootstrapConfig::default());

        let err = run
            .install_tools(&installer(&provider, &layout, &net))
            .unwrap_err();

        assert!(format!("{err:#}").contains("installing zsh"));
        assert_eq!(provider.requested.borrow().as_slice(), ["zsh"]);
        assert!(run.summary.installed.is_empty());
        assert!(run.summary.warnings.is_empty());
    }

    #[test]
    fn test_optional_tool_failure_is_recorded_and_run_continues() {
        let (_temp, layout, provider) =
            setup_failing(PlatformKind::Debian, |name| name == "eza" || name == "bat");
        executable(&provider.bin.join("starship"));
        let net = network();
        let mut run = bootstrap_for(&layout, BootstrapConfig::default());

        run.install_tools(&installer(&provider, &layout, &net)).unwrap();

        assert_eq!(run.summary.installed, vec!["zsh", "fzf", "zoxide"]);
        assert_eq!(run.summary.present, vec!["starship"]);
        assert_eq!(run.summary.skipped, vec!["eza", "bat"]);
        assert_eq!(run.summary.warnings.len(), 2);
        assert!(run.summary.warnings[0].starts_with("optional tool eza: "));
        assert!(run.summary.warnings[1].contains("fake install of bat failed"));
    }

    #[test]
    fn test_skip_optional_never_calls_provider_for_optional_tools() {
        let (_temp, layout, provider) = setup(PlatformKind::Debian, false);
        for bin in ["zsh", "fzf", "starship", "zoxide"] {
            executable(&provider.bin.join(bin));
        }
        let net = network();
        let mut config = BootstrapConfig::default();
        config.install.skip_optional = true;
        let mut run = bootstrap_for(&layout, config);

        run.install_tools(&installer(&provider, &layout, &net)).unwrap();

        assert!(provider.requested.borrow().is_empty());
        assert_eq!(run.summary.skipped, vec!["eza", "bat"]);
        assert!(run.summary.warnings.is_empty());
    }

    #[test]
    fn test_font_cache_failure_becomes_warning() {
        let temp = TempDir::new().unwrap();
        let mut run = bootstrap(temp.path());

        run.refresh_font_cache();

        assert_eq!(run.summary.warnings.len(), 1);
        assert!(run.summary.warnings[0].starts_with("refreshing font cache: fc-cache not found"));
    }
}

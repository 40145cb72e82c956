use anyhow::{Context, Result};
use devshell_bootstrap::config::BootstrapConfig;
use devshell_bootstrap::fetch::Downloader;
use devshell_bootstrap::layout::Layout;
use devshell_bootstrap::platform::provider::locate_brew;
use devshell_bootstrap::platform::{provider_for, Platform, PlatformKind};
use devshell_bootstrap::templates::{ConfigArtifact, Settings};
use devshell_bootstrap::Bootstrap;
use std::io::Write;
use std::path::Path;

use super::parse::{Command, RunArgs};

pub(crate) fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Run(args) => run_bootstrap(&args),
        Command::Render {
            artifact, config, ..
        } => render_artifact(artifact, config.as_deref()),
        Command::Detect { .. } => detect(),
        Command::Help => {
            println!("{}", crate::usage());
            Ok(())
        }
    }
}

/// Fold command-line flags into the loaded configuration.
pub(crate) fn apply_run_args(config: &mut BootstrapConfig, args: &RunArgs) {
    if let Some(proxy) = &args.proxy {
        config.network.proxy = Some(proxy.clone());
    }
    config.install.skip_fonts |= args.skip_fonts;
    config.install.skip_optional |= args.skip_optional;
    if args.no_chsh {
        config.install.change_shell = false;
    }
}

fn run_bootstrap(args: &RunArgs) -> Result<()> {
    let mut config = BootstrapConfig::load(args.config.as_deref())?;
    apply_run_args(&mut config, args);
    let summary = Bootstrap::detect(config)?.run()?;
    summary.log();
    Ok(())
}

fn render_artifact(artifact: ConfigArtifact, config: Option<&Path>) -> Result<()> {
    let config = BootstrapConfig::load(config)?;
    let platform = Platform::detect().context("detecting platform")?;
    let layout = Layout::detect(&platform)?;
    let settings = Settings::resolve(&layout, &platform, &config);

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(artifact.render(&settings).as_bytes())
        .context("writing to stdout")?;
    stdout.flush().context("writing to stdout")
}

fn detect() -> Result<()> {
    let config = BootstrapConfig::load(None)?;
    let platform = Platform::detect().context("detecting platform")?;
    let layout = Layout::detect(&platform)?;

    let provider = match provider_for(platform.kind, &config.network, config.retry) {
        Ok(provider) => provider.name().to_string(),
        Err(_) if platform.kind == PlatformKind::MacOs => "homebrew (not installed)".to_string(),
        Err(err) => return Err(err),
    };
    let downloader = Downloader::detect(&layout)
        .map(|d| d.name())
        .unwrap_or("none");

    println!("platform:    {platform}");
    println!("provider:    {provider}");
    println!("downloader:  {downloader}");
    if let Some(brew) = locate_brew().filter(|_| platform.is_macos()) {
        println!("brew:        {}", brew.display());
    }
    println!("config dir:  {}", layout.config_dir.display());
    println!("font dir:    {}", layout.font_dir.display());
    println!("plugins:     {}", layout.plugin_dir().display());
    println!("backups:     {}", layout.backup_root.display());
    match &config.network.proxy {
        Some(proxy) => println!("proxy:       {proxy}"),
        None => println!("proxy:       none"),
    }
    Ok(())
}

use anyhow::{bail, Context, Result};
use devshell_bootstrap::templates::ConfigArtifact;
use std::path::PathBuf;

/// Flags of the full run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct RunArgs {
    pub(crate) config: Option<PathBuf>,
    pub(crate) proxy: Option<String>,
    pub(crate) skip_fonts: bool,
    pub(crate) skip_optional: bool,
    pub(crate) no_chsh: bool,
    pub(crate) verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Run(RunArgs),
    Render {
        artifact: ConfigArtifact,
        config: Option<PathBuf>,
        verbose: bool,
    },
    Detect {
        verbose: bool,
    },
    Help,
}

impl Command {
    pub(crate) fn verbose(&self) -> bool {
        match self {
            Command::Run(args) => args.verbose,
            Command::Render { verbose, .. } | Command::Detect { verbose } => *verbose,
            Command::Help => false,
        }
    }
}

pub(crate) fn parse_command(args: &[String]) -> Result<Command> {
    match args {
        [] => Ok(Command::Run(RunArgs::default())),
        [help, ..] if matches!(help.as_str(), "help" | "--help" | "-h") => Ok(Command::Help),
        [run, rest @ ..] if run == "run" => parse_run_args(rest).map(Command::Run),
        [render, artifact, rest @ ..] if render == "render" && !artifact.starts_with('-') => {
            let artifact = ConfigArtifact::from_name(artifact)?;
            let run = parse_run_args(rest)?;
            if run.proxy.is_some() || run.skip_fonts || run.skip_optional || run.no_chsh {
                bail!("`render` only accepts --config and --verbose");
            }
            Ok(Command::Render {
                artifact,
                config: run.config,
                verbose: run.verbose,
            })
        }
        [render] if render == "render" => {
            bail!("`render` needs an artifact: zshrc, starship or alacritty")
        }
        [detect, rest @ ..] if detect == "detect" => match rest {
            [] => Ok(Command::Detect { verbose: false }),
            [flag] if flag == "--verbose" || flag == "-v" => Ok(Command::Detect { verbose: true }),
            _ => bail!("`detect` only accepts --verbose"),
        },
        [flag, ..] if flag.starts_with('-') => parse_run_args(args).map(Command::Run),
        [other, ..] => bail!("unknown command '{}'", other),
    }
}

pub(crate) fn parse_run_args(args: &[String]) -> Result<RunArgs> {
    let mut run = RunArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let value = iter.next().context("--config needs a path")?;
                run.config = Some(PathBuf::from(value));
            }
            "--proxy" => {
                let value = iter.next().context("--proxy needs a URL")?;
                if value.trim().is_empty() {
                    bail!("--proxy must not be empty");
                }
                run.proxy = Some(value.trim().to_string());
            }
            "--skip-fonts" => run.skip_fonts = true,
            "--skip-optional" => run.skip_optional = true,
            "--no-chsh" => run.no_chsh = true,
            "--verbose" | "-v" => run.verbose = true,
            other => match other.split_once('=') {
                Some(("--config", value)) => run.config = Some(PathBuf::from(value)),
                Some(("--proxy", value)) if !value.trim().is_empty() => {
                    run.proxy = Some(value.trim().to_string())
                }
                _ => bail!("unknown argument '{}'", other),
            },
        }
    }
    Ok(run)
}

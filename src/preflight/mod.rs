//! Preflight checks for the collaborators the run itself needs.
//!
//! Before any tool is installed the host must have `git`, `unzip` and a
//! downloader. Missing ones are installed through the package provider;
//! whatever is still missing afterwards is reported with its package name.
//!
//! # Example
//!
//! ```rust,ignore
//! use devshell_bootstrap::preflight::{check_required_tools, command_exists};
//!
//! if !command_exists(&layout, "unzip") {
//!     println!("unzip not installed");
//! }
//!
//! let tools = &[("git", "git"), ("unzip", "unzip")];
//! if let Err(e) = check_required_tools(&layout, tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use crate::layout::Layout;
use crate::platform::Platform;
use crate::tools::{Installer, Necessity, COLLABORATORS};
use anyhow::{bail, Context, Result};

/// Check if a command resolves on `PATH` or in `~/.local/bin`.
pub fn command_exists(layout: &Layout, cmd: &str) -> bool {
    layout.find_binary(cmd).is_some()
}

/// Collaborators that must exist after preflight.
///
/// Each tuple is (command_name, package_name). `curl` stands for "curl or
/// wget"; either satisfies it.
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("git", "git"),
    ("unzip", "unzip"),
    ("curl", "curl"),
];

/// Check that specific tools are available.
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` with list of missing tools and their packages
pub fn check_required_tools(layout: &Layout, tools: &[(&str, &str)]) -> Result<()> {
    let mut missing = Vec::new();

    for (tool, package) in tools {
        let found = if *tool == "curl" {
            layout.find_any(&["curl", "wget"]).is_some()
        } else {
            command_exists(layout, tool)
        };
        if !found {
            missing.push((*tool, *package));
        }
    }

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Install missing collaborators, then verify [`REQUIRED_TOOLS`].
///
/// `fontconfig` is only relevant on Linux and is optional there. Failures
/// of optional collaborators do not stop preflight; they are returned for
/// the caller to record.
pub fn ensure_collaborators(
    installer: &Installer<'_>,
    platform: &Platform,
) -> Result<Vec<anyhow::Error>> {
    let mut advisories = Vec::new();
    for tool in COLLABORATORS {
        if tool.name == "fontconfig" && !platform.is_linux() {
            continue;
        }
        match (installer.ensure(tool), tool.necessity) {
            (Ok(_), _) => {}
            (Err(err), Necessity::Required) => {
                return Err(err).context("installing preflight collaborators");
            }
            (Err(err), Necessity::Optional) => {
                advisories.push(err.context(format!("optional collaborator {}", tool.name)));
            }
        }
    }
    check_required_tools(installer.layout, REQUIRED_TOOLS)?;
    Ok(advisories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::platform::PlatformKind;
    use crate::process::RetryPolicy;
    use crate::tools::testing::{network, platform, setup, setup_failing, FakeProvider};
    use std::ffi::OsString;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn layout_with(bins: &[&str]) -> (TempDir, Layout) {
        let temp = TempDir::new().unwrap();
        let bin_dir = temp.path().join("bin");
        fs::create_dir_all(&bin_dir).unwrap();
        for bin in bins {
            let path = bin_dir.join(bin);
            fs::write(&path, "#!/bin/sh\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        let platform = Platform {
            kind: PlatformKind::Debian,
            distro_id: "debian".into(),
            wsl: false,
        };
        let layout = Layout::from_home(
            temp.path().join("home"),
            &platform,
            OsString::from(bin_dir.as_os_str()),
        );
        (temp, layout)
    }

    #[test]
    fn test_command_exists() {
        let (_temp, layout) = layout_with(&["git"]);
        assert!(command_exists(&layout, "git"));
        assert!(!command_exists(&layout, "definitely_not_a_real_command_12345"));
    }

    #[test]
    fn test_check_required_tools_success() {
        let (_temp, layout) = layout_with(&["git", "unzip", "wget"]);
        assert!(check_required_tools(&layout, REQUIRED_TOOLS).is_ok());
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

    #[test]
    fn test_optional_fontconfig_failure_is_returned_not_fatal() {
        let (_temp, layout, provider) =
            setup_failing(PlatformKind::Debian, |name| name == "fontconfig");
        let net = network();

        let advisories = ensure_collaborators(
            &installer(&provider, &layout, &net),
            &platform(PlatformKind::Debian),
        )
        .unwrap();

        assert_eq!(advisories.len(), 1);
        assert!(format!("{:#}", advisories[0]).contains("optional collaborator fontconfig"));
        assert!(command_exists(&layout, "git"));
        assert!(command_exists(&layout, "unzip"));
    }

    #[test]
    fn test_required_collaborator_failure_is_fatal() {
        let (_temp, layout, provider) = setup(PlatformKind::Debian, true);
        let net = network();

        let err = ensure_collaborators(
            &installer(&provider, &layout, &net),
            &platform(PlatformKind::Debian),
        )
        .unwrap_err();

        assert!(format!("{err:#}").contains("installing preflight collaborators"));
        assert_eq!(provider.requested.borrow().as_slice(), ["git"]);
    }

    #[test]
    fn test_fontconfig_not_attempted_on_macos() {
        let (_temp, layout, provider) = setup(PlatformKind::MacOs, false);
        let net = network();

        let advisories = ensure_collaborators(
            &installer(&provider, &layout, &net),
            &platform(PlatformKind::MacOs),
        )
        .unwrap();

        assert!(advisories.is_empty());
        assert!(!provider.requested.borrow().iter().any(|p| p == "fontconfig"));
    }

    #[test]
    fn test_check_required_tools_failure_lists_packages() {
        let (_temp, layout) = layout_with(&["git"]);
        let err = check_required_tools(&layout, REQUIRED_TOOLS).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unzip (install: unzip)"));
        assert!(msg.contains("curl (install: curl)"));
        assert!(!msg.contains("git (install"));
    }
}

//! The fixed tool catalog and how each tool gets installed.
//!
//! A tool is skipped when one of its binaries already resolves. Otherwise
//! the platform package is tried first, then the upstream install script
//! where one exists. Whether a failure stops the run is decided by the
//! caller from [`Tool::necessity`].

use crate::config::NetworkConfig;
use crate::fetch::Downloader;
use crate::layout::Layout;
use crate::platform::{PackageProvider, PlatformKind};
use crate::process::{Cmd, RetryPolicy};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Necessity {
    /// Failure halts the run.
    Required,
    /// Failure is logged and the run continues.
    Optional,
}

/// Package name per provider; `None` where the platform has no package.
#[derive(Debug, Clone, Copy)]
pub struct Packages {
    pub brew: Option<&'static str>,
    pub apt: Option<&'static str>,
    pub yum: Option<&'static str>,
}

impl Packages {
    const fn same(name: &'static str) -> Self {
        Self {
            brew: Some(name),
            apt: Some(name),
            yum: Some(name),
        }
    }

    pub fn for_kind(&self, kind: PlatformKind) -> Option<&'static str> {
        match kind {
            PlatformKind::MacOs => self.brew,
            PlatformKind::Debian => self.apt,
            PlatformKind::Rhel => self.yum,
        }
    }
}

/// Upstream installer script, run with `sh <script> <args>`.
///
/// `{bin}` in an argument is replaced with the user's local bin directory.
#[derive(Debug, Clone, Copy)]
pub struct InstallScript {
    pub url: &'static str,
    pub args: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct Tool {
    pub name: &'static str,
    /// Binaries any of which means the tool is present.
    pub binaries: &'static [&'static str],
    pub necessity: Necessity,
    pub packages: Packages,
    pub script: Option<InstallScript>,
}

/// Collaborators the run itself needs, installed before anything else.
pub const COLLABORATORS: &[Tool] = &[
    Tool {
        name: "git",
        binaries: &["git"],
        necessity: Necessity::Required,
        packages: Packages::same("git"),
        script: None,
    },
    Tool {
        name: "curl",
        binaries: &["curl", "wget"],
        necessity: Necessity::Required,
        packages: Packages::same("curl"),
        script: None,
    },
    Tool {
        name: "unzip",
        binaries: &["unzip"],
        necessity: Necessity::Required,
        packages: Packages::same("unzip"),
        script: None,
    },
    Tool {
        name: "fontconfig",
        binaries: &["fc-cache"],
        necessity: Necessity::Optional,
        packages: Packages {
            brew: None,
            apt: Some("fontconfig"),
            yum: Some("fontconfig"),
        },
        script: None,
    },
];

/// Terminal tooling installed for the user.
pub const TOOLS: &[Tool] = &[
    Tool {
        name: "zsh",
        binaries: &["zsh"],
        necessity: Necessity::Required,
        packages: Packages::same("zsh"),
        script: None,
    },
    Tool {
        name: "fzf",
        binaries: &["fzf"],
        necessity: Necessity::Required,
        packages: Packages::same("fzf"),
        script: None,
    },
    Tool {
        name: "starship",
        binaries: &["starship"],
        necessity: Necessity::Required,
        packages: Packages {
            brew: Some("starship"),
            apt: None,
            yum: None,
        },
        script: Some(InstallScript {
            url: "https://starship.rs/install.sh",
            args: &["-y", "-b", "{bin}"],
        }),
    },
    Tool {
        name: "zoxide",
        binaries: &["zoxide"],
        necessity: Necessity::Required,
        packages: Packages::same("zoxide"),
        script: Some(InstallScript {
            url: "https://raw.githubusercontent.com/ajeetdsouza/zoxide/main/install.sh",
            args: &["--bin-dir", "{bin}"],
        }),
    },
    Tool {
        name: "eza",
        binaries: &["eza"],
        necessity: Necessity::Optional,
        packages: Packages {
            brew: Some("eza"),
            apt: Some("eza"),
            yum: None,
        },
        script: None,
    },
    Tool {
        name: "bat",
        binaries: &["bat", "batcat"],
        necessity: Necessity::Optional,
        packages: Packages::same("bat"),
        script: None,
    },
];

/// A zsh plugin checkout sourced by the generated profile.
#[derive(Debug, Clone, Copy)]
pub struct ZshPlugin {
    pub name: &'static str,
    pub url: &'static str,
    /// Script to source, relative to the checkout.
    pub script: &'static str,
}

/// Sourced in this order; syntax highlighting must come last.
pub const ZSH_PLUGINS: &[ZshPlugin] = &[
    ZshPlugin {
        name: "zsh-autosuggestions",
        url: "https://github.com/zsh-users/zsh-autosuggestions.git",
        script: "zsh-autosuggestions.zsh",
    },
    ZshPlugin {
        name: "zsh-syntax-highlighting",
        url: "https://github.com/zsh-users/zsh-syntax-highlighting.git",
        script: "zsh-syntax-highlighting.zsh",
    },
];

/// How a tool ended up present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    AlreadyPresent(PathBuf),
    Installed(PathBuf),
}

impl ToolStatus {
    pub fn path(&self) -> &PathBuf {
        match self {
            ToolStatus::AlreadyPresent(path) | ToolStatus::Installed(path) => path,
        }
    }
}

/// Installs catalog tools through the provider or upstream scripts.
pub struct Installer<'a> {
    pub provider: &'a dyn PackageProvider,
    pub layout: &'a Layout,
    pub network: &'a NetworkConfig,
    pub retry: RetryPolicy,
}

impl Installer<'_> {
    /// Make `tool` present.
    pub fn ensure(&self, tool: &Tool) -> Result<ToolStatus> {
        if let Some(path) = self.layout.find_any(tool.binaries) {
            info!("{} already present at {}", tool.name, self.layout.pretty(&path));
            return Ok(ToolStatus::AlreadyPresent(path));
        }

        let package = tool.packages.for_kind(self.provider.kind());
        let package_result = match package {
            Some(package) => self.provider.install_package(package),
            None => Err(anyhow::anyhow!(
                "no {} package for {}",
                self.provider.name(),
                tool.name
            )),
        };

        if let Err(package_err) = package_result {
            let Some(script) = tool.script else {
                return Err(package_err).with_context(|| format!("installing {}", tool.name));
            };
            if package.is_some() {
                warn!("{package_err:#}; falling back to the upstream installer");
            }
            self.run_script(tool, &script)
                .with_context(|| format!("installing {} via {}", tool.name, script.url))?;
        }

        match self.layout.find_any(tool.binaries) {
            Some(path) => {
                info!("installed {} at {}", tool.name, self.layout.pretty(&path));
                Ok(ToolStatus::Installed(path))
            }
            None => bail!(
                "{} was installed but none of [{}] is on PATH or in {}",
                tool.name,
                tool.binaries.join(", "),
                self.layout.local_bin.display()
            ),
        }
    }

    fn run_script(&self, tool: &Tool, script: &InstallScript) -> Result<()> {
        let Some(downloader) = Downloader::detect(self.layout) else {
            bail!("neither curl nor wget is available to fetch {}", script.url);
        };
        let path = self
            .layout
            .cache_dir
            .join(format!("{}-install.sh", tool.name));
        if path.exists() {
            // Scripts are small; a stale partial file would only be resumed.
            std::fs::remove_file(&path)
                .with_context(|| format!("removing stale '{}'", path.display()))?;
        }
        downloader.fetch(script.url, &path, self.network, &self.retry)?;

        std::fs::create_dir_all(&self.layout.local_bin).with_context(|| {
            format!("creating '{}'", self.layout.local_bin.display())
        })?;
        let bin = self.layout.local_bin.to_string_lossy();
        script_command(&path, script, &bin)
            .envs(self.network.proxy_env())
            .run_with_retry(&self.retry)
            .into_result(&format!("{} installer", tool.name))
    }
}

fn script_command(path: &std::path::Path, script: &InstallScript, bin: &str) -> Cmd {
    Cmd::new("sh")
        .arg(path)
        .args(script.args.iter().map(|arg| arg.replace("{bin}", bin)))
}

/// Package provider double shared by the installer, preflight and bootstrap
/// tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::platform::Platform;
    use std::cell::RefCell;
    use std::ffi::OsString;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    /// Records requested packages and "installs" them into a bin dir.
    pub(crate) struct FakeProvider {
        pub kind: PlatformKind,
        pub bin: PathBuf,
        pub fails: fn(&str) -> bool,
        pub requested: RefCell<Vec<String>>,
    }

    impl PackageProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        fn kind(&self) -> PlatformKind {
            self.kind
        }

        fn install_package(&self, name: &str) -> Result<()> {
            self.requested.borrow_mut().push(name.to_string());
            if (self.fails)(name) {
                bail!("fake install of {name} failed");
            }
            executable(&self.bin.join(name));
            Ok(())
        }
    }

    pub(crate) fn executable(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Temp home with `usr/bin` as the whole search path.
    pub(crate) fn setup(kind: PlatformKind, fail: bool) -> (TempDir, Layout, FakeProvider) {
        let fails: fn(&str) -> bool = if fail { |_| true } else { |_| false };
        setup_failing(kind, fails)
    }

    pub(crate) fn setup_failing(
        kind: PlatformKind,
        fails: fn(&str) -> bool,
    ) -> (TempDir, Layout, FakeProvider) {
        let temp = TempDir::new().unwrap();
        let sys_bin = temp.path().join("usr/bin");
        fs::create_dir_all(&sys_bin).unwrap();
        let layout = Layout::from_home(
            temp.path().join("home"),
            &platform(kind),
            OsString::from(sys_bin.as_os_str()),
        );
        let provider = FakeProvider {
            kind,
            bin: sys_bin,
            fails,
            requested: RefCell::new(Vec::new()),
        };
        (temp, layout, provider)
    }

    pub(crate) fn platform(kind: PlatformKind) -> Platform {
        Platform {
            kind,
            distro_id: "test".into(),
            wsl: false,
        }
    }

    pub(crate) fn network() -> NetworkConfig {
        NetworkConfig {
            proxy: None,
            no_proxy: None,
            connect_timeout_secs: 1,
        }
    }
}

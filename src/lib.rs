//! One-shot terminal environment bootstrapper.
//!
//! Brings a macOS, Debian-family or RHEL-family host to a known terminal
//! setup: zsh with plugins, the starship prompt, fzf, zoxide, optional
//! eza and bat, a Nerd Font, and generated configs for zsh, starship and
//! alacritty. Safe to re-run: every file it replaces is backed up first.
//!
//! - **Retry executor** - [`process::retry`] and [`process::Cmd`] run
//!   external collaborators with a fixed attempt budget
//! - **Atomic config writer** - [`writer::ConfigWriter`] renders to a
//!   temporary file and renames it into place after backing up the old one
//! - **Providers** - one [`platform::PackageProvider`] per platform family
//! - **Run** - [`bootstrap::Bootstrap`] sequences everything
//!
//! # Architecture
//!
//! ```text
//! bin/devshell-bootstrap
//!     │
//!     ├── config ──> BootstrapConfig (TOML + flags + inherited proxy)
//!     └── bootstrap::Bootstrap
//!             ├── platform + provider ──> process::Cmd (retried)
//!             ├── preflight, tools, fonts ──> fetch (curl/wget, git, unzip)
//!             ├── templates ──> writer::ConfigWriter ──> backup::BackupDir
//!             └── cleanup, WSL sync, login shell
//! ```

pub mod backup;
pub mod bootstrap;
pub mod config;
pub mod fetch;
pub mod fonts;
pub mod layout;
pub mod logging;
pub mod platform;
pub mod preflight;
pub mod process;
pub mod templates;
pub mod tools;
pub mod writer;

pub use bootstrap::{Bootstrap, Summary};
pub use config::BootstrapConfig;
pub use process::{retry, Cmd, RetryOutcome, RetryPolicy};
pub use writer::{ConfigWriter, WriteOutcome};

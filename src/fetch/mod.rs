//! Network and archive collaborators.
//!
//! Thin wrappers over external CLIs with well-known contracts:
//!
//! - [`download`] - `curl` or `wget`, resumable, retried
//! - [`git`] - shallow clones and fast-forward updates
//! - [`archive`] - `unzip` extraction
//!
//! Network settings arrive as an explicit [`NetworkConfig`](crate::config::NetworkConfig)
//! and are applied per invocation.

pub mod archive;
pub mod download;
pub mod git;

pub use download::Downloader;
pub use git::{ensure_repo, RepoState};

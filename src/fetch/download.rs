//! File downloads through `curl` or `wget`.
//!
//! The first available tool wins. Both are invoked in resume mode so a
//! retried attempt continues a partial file instead of starting over.

use crate::config::NetworkConfig;
use crate::layout::Layout;
use crate::process::{Cmd, RetryPolicy};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Available download tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Downloader {
    Curl(PathBuf),
    Wget(PathBuf),
}

impl Downloader {
    /// Pick `curl`, else `wget`.
    pub fn detect(layout: &Layout) -> Option<Self> {
        layout
            .find_binary("curl")
            .map(Downloader::Curl)
            .or_else(|| layout.find_binary("wget").map(Downloader::Wget))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Downloader::Curl(_) => "curl",
            Downloader::Wget(_) => "wget",
        }
    }

    /// Command fetching `url` into `dest`, resuming any partial file.
    pub fn command(&self, url: &str, dest: &Path, network: &NetworkConfig) -> Cmd {
        let timeout = network.connect_timeout_secs.to_string();
        match self {
            Downloader::Curl(bin) => {
                let mut cmd = Cmd::new(bin)
                    .args(["-fsSL", "-C", "-", "--connect-timeout", timeout.as_str()])
                    .arg("-o")
                    .arg(dest);
                if let Some(proxy) = &network.proxy {
                    cmd = cmd.args(["--proxy", proxy.as_str()]);
                }
                if let Some(no_proxy) = &network.no_proxy {
                    cmd = cmd.args(["--noproxy", no_proxy.as_str()]);
                }
                cmd.arg(url)
            }
            Downloader::Wget(bin) => {
                let mut cmd = Cmd::new(bin)
                    .args(["-q", "-c", "-T", timeout.as_str()])
                    .arg("-O")
                    .arg(dest);
                if network.proxy.is_some() {
                    cmd = cmd.args(["-e", "use_proxy=yes"]);
                }
                cmd.envs(network.proxy_env()).arg(url)
            }
        }
    }

    /// Download `url` to `dest`, retrying per `retry`.
    ///
    /// The parent directory is created. A failure after all attempts is an
    /// error; the partial file is left for the next run to resume.
    pub fn fetch(
        &self,
        url: &str,
        dest: &Path,
        network: &NetworkConfig,
        retry: &RetryPolicy,
    ) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating download directory '{}'", parent.display()))?;
        }
        info!("downloading {url} with {}", self.name());
        self.command(url, dest, network)
            .run_with_retry(retry)
            .into_result(&format!("downloading {url}"))?;

        if !dest.is_file() {
            bail!(
                "{} reported success but '{}' does not exist",
                self.name(),
                dest.display()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Platform, PlatformKind};
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn network(proxy: Option<&str>) -> NetworkConfig {
        NetworkConfig {
            proxy: proxy.map(String::from),
            no_proxy: None,
            connect_timeout_secs: 9,
        }
    }

    #[test]
    fn test_curl_resumes_and_uses_explicit_proxy() {
        let curl = Downloader::Curl(PathBuf::from("curl"));
        let cmd = curl.command(
            "https://example.com/f.zip",
            Path::new("/tmp/f.zip"),
            &network(Some("http://p:3128")),
        );
        assert_eq!(
            cmd.display(),
            "curl -fsSL -C - --connect-timeout 9 -o /tmp/f.zip --proxy http://p:3128 https://example.com/f.zip"
        );
    }

    #[test]
    fn test_wget_continues_partial_download() {
        let wget = Downloader::Wget(PathBuf::from("wget"));
        let cmd = wget.command("https://example.com/f.zip", Path::new("/tmp/f.zip"), &network(None));
        assert_eq!(
            cmd.display(),
            "wget -q -c -T 9 -O /tmp/f.zip https://example.com/f.zip"
        );
    }

    #[test]
    fn test_detect_prefers_curl() {
        let platform = Platform {
            kind: PlatformKind::Debian,
            distro_id: "debian".into(),
            wsl: false,
        };
        let layout = Layout::from_home(
            PathBuf::from("/nonexistent-home"),
            &platform,
            std::env::var_os("PATH").unwrap_or_else(OsString::new),
        );
        match Downloader::detect(&layout) {
            Some(Downloader::Curl(_)) => assert!(layout.find_binary("curl").is_some()),
            Some(Downloader::Wget(_)) => assert!(layout.find_binary("curl").is_none()),
            None => {
                assert!(layout.find_binary("curl").is_none());
                assert!(layout.find_binary("wget").is_none());
            }
        }
    }

    #[test]
    fn test_fetch_local_file_with_curl() {
        let Ok(curl) = which::which("curl") else {
            return;
        };
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src.txt");
        fs::write(&src, "payload").unwrap();
        let dest = temp.path().join("out/dest.txt");

        Downloader::Curl(curl)
            .fetch(
                &format!("file://{}", src.display()),
                &dest,
                &network(None),
                &RetryPolicy::once(),
            )
            .unwrap();

        assert_eq!(fs::read_to_string(dest).unwrap(), "payload");
    }
}

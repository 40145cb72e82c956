//! Copying the terminal config to the Windows side under WSL.
//!
//! Alacritty on Windows reads `%APPDATA%\alacritty\alacritty.toml`. The
//! Windows path is resolved through `cmd.exe` and translated with
//! `wslpath`.

use crate::process::Cmd;
use crate::writer::{ConfigWriter, WriteOutcome};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Relative location of the terminal config under `%APPDATA%`.
pub const WINDOWS_TERMINAL_CONFIG: &str = "alacritty/alacritty.toml";

/// Extract the Windows `%APPDATA%` value from `cmd.exe` output.
///
/// `cmd.exe` may print a UNC-path warning before the value, and echoes the
/// literal `%APPDATA%` when the variable is unset.
pub fn parse_appdata(stdout: &str) -> Result<String> {
    let Some(line) = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
    else {
        bail!("cmd.exe printed nothing for %APPDATA%");
    };
    if line.contains("%APPDATA%") {
        bail!("%APPDATA% is not set on the Windows side");
    }
    Ok(line.to_string())
}

/// `%APPDATA%` as a Linux path.
pub fn windows_appdata() -> Result<PathBuf> {
    let mut echo = Cmd::new("cmd.exe").args(["/c", "echo %APPDATA%"]);
    // Avoids the UNC working-directory warning.
    if Path::new("/mnt/c").is_dir() {
        echo = echo.current_dir("/mnt/c");
    }
    let windows = parse_appdata(&echo.run().context("querying %APPDATA% via cmd.exe")?.stdout)?;

    let translated = Cmd::new("wslpath")
        .args(["-u", windows.as_str()])
        .run()
        .with_context(|| format!("translating '{windows}' with wslpath"))?;
    let path = translated.stdout_trimmed();
    if path.is_empty() {
        bail!("wslpath returned nothing for '{windows}'");
    }
    Ok(PathBuf::from(path))
}

/// Write `content` to the Windows terminal config under `appdata`.
pub fn sync_terminal_config(
    writer: &mut ConfigWriter,
    appdata: &Path,
    content: &str,
) -> Result<WriteOutcome> {
    writer.write_str(&appdata.join(WINDOWS_TERMINAL_CONFIG), content)
}

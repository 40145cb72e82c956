//! External command execution.
//!
//! [`Cmd`] is a small builder over [`std::process::Command`] that keeps the
//! invocation printable for logs. Commands run either once ([`Cmd::run`],
//! output captured) or through the retry executor ([`Cmd::run_with_retry`],
//! output inherited so the operator sees package manager progress).
//!
//! The retry executor never fails: it reports how many attempts it made and
//! the exit code of the last one. Callers decide whether that is fatal
//! ([`RetryOutcome::into_result`]) or advisory.
//!
//! # Example
//!
//! ```rust,ignore
//! use devshell_bootstrap::process::{Cmd, RetryPolicy};
//!
//! let outcome = Cmd::new("git")
//!     .args(["clone", "--depth=1", url, dir])
//!     .run_with_retry(&RetryPolicy::default());
//! outcome.into_result("cloning plugin")?;
//! ```

use anyhow::{bail, Context, Result};
use std::ffi::{OsStr, OsString};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;
use tracing::{debug, warn};

/// Exit code reported when the program could not be spawned at all.
pub const SPAWN_FAILURE_CODE: i32 = 127;

/// Default number of attempts for retried commands.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Default constant delay between attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

/// Fixed-count, fixed-delay retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy. An attempt count of zero is raised to one.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// Single attempt, no delay.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, DEFAULT_DELAY)
    }
}

/// Result of a retried command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOutcome {
    /// Attempts actually performed (1..=policy.attempts).
    pub attempts: u32,
    /// Exit code of the last attempt; 0 on success.
    pub code: i32,
}

impl RetryOutcome {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Turn a failed outcome into an error naming the step.
    pub fn into_result(self, step: &str) -> Result<()> {
        if self.success() {
            return Ok(());
        }
        bail!(
            "{} failed after {} attempt(s) with exit status {}",
            step,
            self.attempts,
            self.code
        )
    }
}

/// Run `attempt` until it returns 0 or the policy is exhausted.
///
/// `attempt` receives the 1-based attempt number and returns an exit code.
/// The delay is slept between attempts, never after the last one. Callers
/// that need to reset side effects between attempts do it inside the
/// closure.
pub fn retry<F>(policy: &RetryPolicy, mut attempt: F) -> RetryOutcome
where
    F: FnMut(u32) -> i32,
{
    let mut code = 0;
    for n in 1..=policy.attempts {
        code = attempt(n);
        if code == 0 {
            return RetryOutcome { attempts: n, code };
        }
        if n < policy.attempts {
            warn!(
                "attempt {}/{} failed with status {}; retrying in {}s",
                n,
                policy.attempts,
                code,
                policy.delay.as_secs_f32()
            );
            std::thread::sleep(policy.delay);
        }
    }
    RetryOutcome {
        attempts: policy.attempts,
        code,
    }
}

/// Map an exit status to a shell-style code.
fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => -1,
    }
}

/// Captured result of a single command run.
#[derive(Debug, Clone)]
pub struct CmdResult {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CmdResult {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Trimmed stdout, the usual shape for one-line queries.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Builder for an external command invocation.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    cwd: Option<PathBuf>,
    allow_fail: bool,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            envs: Vec::new(),
            cwd: None,
            allow_fail: false,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Set an environment variable for this invocation only.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        for (k, v) in vars {
            self = self.env(k, v);
        }
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Do not turn a non-zero exit into an error in [`Cmd::run`].
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    /// Printable command line for logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        for (k, v) in &self.envs {
            command.env(k, v);
        }
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        command
    }

    /// Run once with captured output.
    ///
    /// Errors when the program cannot be spawned, or when it exits non-zero
    /// unless [`Cmd::allow_fail`] was set.
    pub fn run(&self) -> Result<CmdResult> {
        debug!("running: {}", self.display());
        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("spawning '{}'", self.display()))?;

        let result = CmdResult {
            code: exit_code(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() && !self.allow_fail {
            bail!(
                "'{}' exited with status {}: {}",
                self.display(),
                result.code,
                result.stderr.trim()
            );
        }
        Ok(result)
    }

    /// Run once with inherited stdio and return the exit code.
    ///
    /// Spawn failures are reported as [`SPAWN_FAILURE_CODE`].
    pub fn status_code(&self) -> i32 {
        debug!("running: {}", self.display());
        match self.command().status() {
            Ok(status) => exit_code(status),
            Err(err) => {
                warn!("could not start '{}': {err}", self.display());
                SPAWN_FAILURE_CODE
            }
        }
    }

    /// Run through the retry executor.
    pub fn run_with_retry(&self, policy: &RetryPolicy) -> RetryOutcome {
        retry(policy, |_| self.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Instant;
    use tempfile::TempDir;

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(5))
    }

    #[test]
    fn test_retry_stops_at_first_success() {
        let calls = Cell::new(0);
        let outcome = retry(&fast(3), |n| {
            calls.set(calls.get() + 1);
            if n == 2 {
                0
            } else {
                1
            }
        });

        assert!(outcome.success());
        assert_eq!(outcome.attempts, 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_retry_exhausts_budget_and_reports_last_status() {
        let calls = Cell::new(0);
        let outcome = retry(&fast(3), |n| {
            calls.set(calls.get() + 1);
            n as i32 + 10
        });

        assert!(!outcome.success());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.code, 13);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_zero_attempts_runs_once() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.attempts(), 1);

        let outcome = retry(&policy, |_| 4);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.code, 4);
    }

    #[test]
    fn test_always_failing_command_returns_its_status() {
        let outcome = Cmd::new("sh").args(["-c", "exit 7"]).run_with_retry(&fast(3));
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.code, 7);
    }

    #[test]
    fn test_command_succeeding_on_third_attempt_waits_between_attempts() {
        let temp = TempDir::new().unwrap();
        let counter = temp.path().join("count");
        let script = format!(
            "n=$(cat '{0}' 2>/dev/null || echo 0); n=$((n+1)); echo $n > '{0}'; [ $n -ge 3 ]",
            counter.display()
        );
        let delay = Duration::from_millis(50);
        let policy = RetryPolicy::new(3, delay);

        let started = Instant::now();
        let outcome = Cmd::new("sh").args(["-c", script.as_str()]).run_with_retry(&policy);

        assert!(outcome.success());
        assert_eq!(outcome.attempts, 3);
        assert!(started.elapsed() >= delay * 2);
        assert_eq!(std::fs::read_to_string(&counter).unwrap().trim(), "3");
    }

    #[test]
    fn test_missing_program_maps_to_spawn_failure() {
        let outcome =
            Cmd::new("definitely_not_a_real_command_12345").run_with_retry(&fast(2));
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.code, SPAWN_FAILURE_CODE);
    }

    #[test]
    fn test_into_result_names_step() {
        let err = RetryOutcome { attempts: 3, code: 7 }
            .into_result("installing fzf")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("installing fzf"));
        assert!(msg.contains("3 attempt"));
        assert!(msg.contains('7'));
    }

    #[test]
    fn test_run_captures_output_and_env() {
        let result = Cmd::new("sh")
            .args(["-c", "printf '%s' \"$GREETING\""])
            .env("GREETING", "hello")
            .run()
            .unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "hello");
    }

    #[test]
    fn test_run_fails_on_nonzero_unless_allowed() {
        assert!(Cmd::new("sh").args(["-c", "exit 3"]).run().is_err());

        let result = Cmd::new("sh")
            .args(["-c", "exit 3"])
            .allow_fail()
            .run()
            .unwrap();
        assert_eq!(result.code, 3);
    }

    #[test]
    fn test_display_joins_program_and_args() {
        let cmd = Cmd::new("git").args(["clone", "--depth=1", "url"]);
        assert_eq!(cmd.display(), "git clone --depth=1 url");
    }
}

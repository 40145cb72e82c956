//! Log setup for the binary.
//!
//! Logs go to stderr so that `render` output on stdout stays clean.

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "DEVSHELL_LOG";

const DEFAULT_FILTER: &str = "devshell_bootstrap=info";
const VERBOSE_FILTER: &str = "devshell_bootstrap=debug";

/// Filter from [`LOG_ENV`], else the default for the verbosity.
pub fn filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    match std::env::var(LOG_ENV) {
        Ok(raw) if !raw.trim().is_empty() => {
            EnvFilter::try_new(&raw).unwrap_or_else(|_| EnvFilter::new(fallback))
        }
        _ => EnvFilter::new(fallback),
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter(verbose))
        .with_target(false)
        .without_time()
        .try_init();
}

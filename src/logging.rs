use std::io::{self, IsTerminal};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "RESUME_SESSIONS_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Diagnostics go to stderr so stdout stays clean for command output and OSC sequences.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none())
        .with_target(false)
        .try_init();
}

//! Diagnostic logging to stderr.
//!
//! Normal program output goes to stdout through the console; anything
//! logged here lands on stderr so storage problems stay visible without
//! mixing into the menu.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Filter comes from `RUST_LOG`, default `warn`.
/// Calling this more than once is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

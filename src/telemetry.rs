//! Logging setup for the binary.
//!
//! Log lines go to stderr so that stdout carries nothing but the
//! JSON run report.

use tracing_subscriber::EnvFilter;

/// Install a `tracing` fmt subscriber filtered by `RUST_LOG`
/// (default `info`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed (tests, embedding)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

//! Logging initialization
//!
//! Installs a global `tracing` subscriber with an `EnvFilter`. `RUST_LOG`
//! wins over the configured default directive.

use crate::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for a binary
///
/// # Arguments
/// * `default_directive` - Filter used when RUST_LOG is unset (e.g. "info")
///
/// # Errors
/// Returns `Error::Internal` if a global subscriber is already installed.
pub fn init_tracing(default_directive: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(build_filter(default_directive))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| Error::Internal(format!("Tracing init failed: {}", e)))
}

/// Build the env filter, falling back to `default_directive`
pub fn build_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

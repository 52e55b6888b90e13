//! Tracing subscriber set-up for binaries and test harnesses.

use std::error::Error;

use tracing_subscriber::{EnvFilter, fmt};

/// Install a JSON fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// # Errors
///
/// Returns the init error when a global subscriber is already installed.
pub fn init_tracing() -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().try_init()
}

//! Logging setup based on `tracing-subscriber`.
//!
//! `RUST_LOG` takes precedence over the filter passed in, so a binary can ship
//! a sensible default while still letting users turn up verbosity.

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Default filter: verbose for sprig, quiet for the wgpu stack.
pub const DEFAULT_FILTER: &str = "debug,wgpu_core=info,wgpu_hal=info,naga=info";

fn env_filter(filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter))
}

/// Install the global subscriber with [`DEFAULT_FILTER`].
///
/// # Panics
///
/// Panics if a global subscriber has already been installed.
pub fn init() {
    init_with_filter(DEFAULT_FILTER);
}

/// Install the global subscriber with a custom filter directive.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed.
pub fn init_with_filter(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter))
        .init();
}

/// Install the global subscriber using the filter from a [`Config`].
///
/// Unlike [`init`], this does not panic when a subscriber already exists,
/// which makes it safe to call from tests and examples.
pub fn try_init(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.log_filter))
        .try_init()
}

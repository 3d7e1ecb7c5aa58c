//! Tracing setup for the sqlfan CLI
//!
//! Usage:
//!   sqlfan --debug ...              # Debug logging to console
//!   RUST_LOG=sqlfan=debug sqlfan    # Fine-grained log control

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Tracing configuration options
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Enable debug logging (sets RUST_LOG=debug if not already set)
    pub debug: bool,
    /// Fallback filter when neither RUST_LOG nor --debug is in play
    pub default_filter: Option<String>,
}

/// Initialize console tracing
pub fn init(config: &TracingConfig) -> Result<()> {
    let fallback = if config.debug {
        "debug"
    } else {
        config.default_filter.as_deref().unwrap_or("info")
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.debug) // Show targets in debug mode
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

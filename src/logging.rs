use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Installs the global tracing subscriber. `RUST_LOG` takes precedence over
/// the configured level.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.pretty().try_init()
    };

    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}

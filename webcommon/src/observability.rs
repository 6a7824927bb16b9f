//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::Result};

/// Install the JSON log subscriber
///
/// The filter comes from [`Config::log_filter`]; an unparsable directive falls
/// back to `info`. Calling this again after a subscriber is installed only
/// logs a notice.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = config.log_filter();

    let installed = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    match installed {
        Ok(()) => tracing::info!(
            environment = %config.service.environment,
            "Tracing initialized for service: {}",
            config.service.name
        ),
        Err(_) => tracing::debug!("Tracing subscriber already installed"),
    }

    Ok(())
}

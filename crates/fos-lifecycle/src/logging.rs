//! Logging bootstrap

use tracing_subscriber::EnvFilter;

use crate::Config;

/// Install a `tracing` fmt subscriber
///
/// `RUST_LOG` wins over [`Config::log_filter`]. Returns `false` when a global
/// subscriber was already installed, in which case nothing changes.
pub fn init_logging(config: &Config) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|err| {
            eprintln!("Invalid log filter {:?}: {}", config.log_filter, err);
            EnvFilter::new("info")
        });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

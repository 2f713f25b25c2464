use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;
use crate::error::LogError;
use crate::error::Result;

/// Installs a fmt subscriber on stderr. `RUST_LOG` overrides the config's
/// `log_filter`. Only binaries call this.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .map_err(|err| LogError::Telemetry(err.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| LogError::Telemetry(err.to_string()))
}

use crate::config::Config;
use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

/// Installs the `tracing` subscriber. `RUST_LOG` takes precedence over
/// `PROBE_LOG_LEVEL`; library events keep their `keypin::` target so pin
/// decisions can be filtered separately.
pub fn setup_logging(cfg: &Config) -> anyhow::Result<()> {
    let default = cfg.log_level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("install tracing subscriber: {e}"))
}

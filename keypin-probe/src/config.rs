use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
/// Runtime configuration loaded from `PROBE_*` environment variables.
pub struct Config {
    pub log_level: Option<String>,

    /// Server name to connect to; also the pin lookup key.
    pub host: String,

    #[serde(default = "def_port")]
    pub port: u16,

    /// JSON pin file, see `keypin::pinning::PinningConfig`.
    pub pins_path: PathBuf,

    #[serde(default = "def_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Config {
    /// Populates the configuration from environment variables, honoring `.env`.
    pub fn from_env() -> anyhow::Result<Self> {
        tracing::debug!("fetching config");
        let _ = dotenvy::dotenv();
        let cfg: Self = envy::prefixed("PROBE_").from_env()?;
        Ok(cfg)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Emit the effective configuration via tracing.
    pub fn info(&self) {
        tracing::info!(
            host = %self.host,
            port = self.port,
            pins_path = %self.pins_path.display(),
            connect_timeout_secs = self.connect_timeout_secs,
            "effective config"
        );
        if self.host.ends_with('.') || self.host.chars().any(|c| c.is_ascii_uppercase()) {
            tracing::warn!("host is not normalised; pins are looked up by exact name");
        }
    }
}

fn def_port() -> u16 {
    443
}

fn def_connect_timeout_secs() -> u64 {
    10
}

use anyhow::Result;

mod config;
mod logging;
mod probe;

use probe::Probe;

/// Parses configuration, initialises logging, and runs one pinned handshake.
#[tokio::main]
async fn main() -> Result<()> {
    let cfg = config::Config::from_env()?;
    logging::setup_logging(&cfg)?;
    cfg.info();

    let probe = Probe::builder(cfg).load_pins()?.build()?;

    probe.run().await
}

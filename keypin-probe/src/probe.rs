use anyhow::{anyhow, Context, Result};
use keypin::pinning::util::spki_der;
use keypin::pinning::{Fingerprint, KeyPins, PinningConfig, PinningServerVerifier};
use rustls::crypto::{self, CryptoProvider};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::{debug, info, warn};

use crate::config::Config;

/// One TLS handshake against `host:port` with pin enforcement installed.
pub struct Probe {
    cfg: Config,
    tls: Arc<ClientConfig>,
}

impl Probe {
    pub fn builder(cfg: Config) -> ProbeBuilder {
        ProbeBuilder::from(cfg)
    }

    /// Connects, completes the handshake, and logs the served key fingerprints.
    pub async fn run(&self) -> Result<()> {
        let addr = (self.cfg.host.as_str(), self.cfg.port);
        let server_name = ServerName::try_from(self.cfg.host.clone())
            .with_context(|| format!("invalid server name {:?}", self.cfg.host))?;

        let tcp = timeout(self.cfg.connect_timeout(), TcpStream::connect(addr))
            .await
            .map_err(|_| anyhow!("connect to {}:{} timed out", self.cfg.host, self.cfg.port))?
            .with_context(|| format!("connect to {}:{}", self.cfg.host, self.cfg.port))?;

        let connector = TlsConnector::from(self.tls.clone());
        let handshake = timeout(self.cfg.connect_timeout(), connector.connect(server_name, tcp))
            .await
            .map_err(|_| anyhow!("TLS handshake with {} timed out", self.cfg.host))?;

        let stream = match handshake {
            Ok(stream) => stream,
            Err(e) => {
                warn!(host = %self.cfg.host, error = %e, "pinned handshake rejected");
                return Err(anyhow!(e).context("TLS handshake"));
            }
        };

        let (_, session) = stream.get_ref();
        let served = session.peer_certificates().unwrap_or_default();
        for (depth, cert) in served.iter().enumerate() {
            match spki_der(cert.as_ref()) {
                Ok(spki) => info!(depth, pin_sha256 = %Fingerprint::of_spki(spki), "served key"),
                Err(e) => warn!(depth, error = %e, "could not decode served certificate"),
            }
        }

        info!(host = %self.cfg.host, "pinned handshake accepted");
        Ok(())
    }
}

pub struct ProbeBuilder {
    cfg: Config,
    pins: Option<Arc<KeyPins>>,
}

impl ProbeBuilder {
    pub fn from(cfg: Config) -> Self {
        if CryptoProvider::install_default(crypto::ring::default_provider()).is_err() {
            debug!("process crypto provider already installed; keeping it");
        }

        Self { cfg, pins: None }
    }

    pub fn load_pins(mut self) -> Result<Self> {
        let pin_cfg = PinningConfig::load_from_file(&self.cfg.pins_path)
            .with_context(|| format!("load pins from {:?}", self.cfg.pins_path))?;
        let pins = KeyPins::from_config(&pin_cfg).context("build pin policy")?;
        info!(
            must_pin = pins.must_pin(),
            enforce = pins.enforce_storage().is_some(),
            report_only = pins.report_only_storage().is_some(),
            "pin policy loaded"
        );
        self.pins = Some(Arc::new(pins));
        Ok(self)
    }

    pub fn build(self) -> Result<Probe> {
        let pins = self.pins.ok_or_else(|| anyhow!("pin policy not loaded"))?;

        let roots = Arc::new(RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        });
        let provider = CryptoProvider::get_default()
            .cloned()
            .unwrap_or_else(|| Arc::new(crypto::ring::default_provider()));
        let verifier = PinningServerVerifier::new(roots, provider, pins)
            .context("build pinning verifier")?;

        let tls = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();

        Ok(Probe {
            cfg: self.cfg,
            tls: Arc::new(tls),
        })
    }
}

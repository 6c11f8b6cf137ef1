use super::chain::{matches, FingerprintCache, VerifiedChain};
use super::config::PinningConfig;
use super::errors::PinError;
use super::header::{HeaderParser, Rfc7469Parser};
use super::report::{LogReporter, PinViolation, ViolationReporter};
use super::resolver::resolve_pair;
use super::storage::Storage;
use super::types::{Pin, PinMode, ResolvedPins};
use http::HeaderMap;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Pin policy: enforce and report-only stores plus the must-pin default.
///
/// Holds no per-call state; share it as `Arc<KeyPins>` across handshakes.
pub struct KeyPins {
    enforce: Option<Arc<dyn Storage>>,
    report_only: Option<Arc<dyn Storage>>,
    must_pin: bool,
    reporter: Arc<dyn ViolationReporter>,
    parser: Arc<dyn HeaderParser>,
}

impl KeyPins {
    pub fn builder() -> KeyPinsBuilder {
        KeyPinsBuilder::default()
    }

    /// Builds a policy backed by in-memory stores preloaded from `cfg`.
    pub fn from_config(cfg: &PinningConfig) -> Result<Self, PinError> {
        let mut builder = Self::builder().must_pin(cfg.must_pin);
        if let Some(store) = cfg.enforce_storage()? {
            builder = builder.enforce(Arc::new(store));
        }
        if let Some(store) = cfg.report_only_storage()? {
            builder = builder.report_only(Arc::new(store));
        }
        Ok(builder.build())
    }

    pub fn enforce_storage(&self) -> Option<&dyn Storage> {
        self.enforce.as_deref()
    }

    pub fn report_only_storage(&self) -> Option<&dyn Storage> {
        self.report_only.as_deref()
    }

    pub fn must_pin(&self) -> bool {
        self.must_pin
    }

    /// Effective enforce and report-only pins for `host`.
    pub fn get_pins(&self, host: &str) -> Result<ResolvedPins, PinError> {
        resolve_pair(host, self.enforce.as_deref(), self.report_only.as_deref())
    }

    /// Checks verified chains presented by `host` against its pins.
    pub fn verify(&self, host: &str, chains: &[VerifiedChain<'_>]) -> Result<(), PinError> {
        self.verify_at(host, chains, SystemTime::now())
    }

    /// Same as [`verify`](Self::verify) with expiry evaluated at `now`.
    pub fn verify_at<'a>(
        &self,
        host: &str,
        chains: &[VerifiedChain<'a>],
        now: SystemTime,
    ) -> Result<(), PinError> {
        if chains.is_empty() {
            warn!(host = %host, "no verified chain; refusing to evaluate pins");
            return Err(PinError::UnverifiedChain);
        }

        let ResolvedPins { enforce, report } = self.get_pins(host)?;
        let enforce = enforce.filter(|pin| !pin.fingerprints.is_empty());
        let report = report.filter(|pin| !pin.fingerprints.is_empty());

        if enforce.is_none() && self.must_pin {
            warn!(host = %host, "no enforce pin for must-pin host");
            return Err(PinError::MissingPins {
                host: host.to_owned(),
            });
        }

        if enforce.is_none() && report.is_none() {
            debug!(host = %host, "no pins configured");
            return Ok(());
        }

        let mut cache = FingerprintCache::with_capacity(chains[0].len());

        if let Some(pin) = report.as_deref().filter(|pin| pin.is_valid_at(now)) {
            if !matches(chains, &pin.fingerprints, &mut cache) {
                self.report_violation(host, PinMode::ReportOnly, pin, chains, &mut cache);
            }
        }

        let Some(pin) = enforce.as_deref().filter(|pin| pin.is_valid_at(now)) else {
            debug!(host = %host, "enforce pin absent or expired; accepting");
            return Ok(());
        };

        if matches(chains, &pin.fingerprints, &mut cache) {
            debug!(host = %host, "certificate chain matches enforce pin");
            return Ok(());
        }

        self.report_violation(host, PinMode::Enforce, pin, chains, &mut cache);
        warn!(host = %host, "certificate chain matches no enforce pin");
        Err(PinError::PinMismatch {
            host: host.to_owned(),
        })
    }

    /// Verification hook for one server name, suitable for a TLS
    /// peer-certificate callback.
    pub fn verify_peer_certificate<'s>(
        &'s self,
        sni: &str,
    ) -> impl Fn(&[VerifiedChain<'_>]) -> Result<(), PinError> + Send + Sync + 's {
        let host = sni.to_owned();
        move |chains| self.verify(&host, chains)
    }

    /// Applies the enforce and report-only pinning headers of a response from
    /// `host` to their stores.
    ///
    /// Stops at the first parse or storage failure; a failed enforce header
    /// leaves the report-only store untouched. An absent or empty header
    /// removes the stored pin for that category.
    pub fn apply_headers(&self, host: &str, headers: &HeaderMap) -> Result<(), PinError> {
        let now = SystemTime::now();
        let categories = [
            (PinMode::Enforce, self.enforce.as_deref()),
            (PinMode::ReportOnly, self.report_only.as_deref()),
        ];

        for (mode, storage) in categories {
            let Some(storage) = storage else {
                continue;
            };
            let value = header_value(headers, mode.header_name())?;
            match self.parser.parse(value, now)? {
                Some(pin) => {
                    debug!(
                        host = %host,
                        mode = %mode,
                        pins = pin.fingerprints.len(),
                        "storing pin"
                    );
                    storage.set(host, pin)?;
                }
                None => {
                    debug!(host = %host, mode = %mode, "clearing pin");
                    storage.remove(host)?;
                }
            }
        }
        Ok(())
    }

    fn report_violation<'a>(
        &self,
        host: &str,
        mode: PinMode,
        pin: &Pin,
        chains: &[VerifiedChain<'a>],
        cache: &mut FingerprintCache<'a>,
    ) {
        let served = cache.chain_fingerprints(&chains[0]);
        self.reporter.report(&PinViolation::new(host, mode, pin, served));
    }
}

impl fmt::Debug for KeyPins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPins")
            .field("enforce", &self.enforce.is_some())
            .field("report_only", &self.report_only.is_some())
            .field("must_pin", &self.must_pin)
            .finish_non_exhaustive()
    }
}

fn header_value<'h>(headers: &'h HeaderMap, name: &str) -> Result<&'h str, PinError> {
    match headers.get(name) {
        Some(value) => value
            .to_str()
            .map_err(|e| PinError::Header(format!("{name}: {e}"))),
        None => Ok(""),
    }
}

/// Assembles a [`KeyPins`]; both stores start disabled.
pub struct KeyPinsBuilder {
    enforce: Option<Arc<dyn Storage>>,
    report_only: Option<Arc<dyn Storage>>,
    must_pin: bool,
    reporter: Arc<dyn ViolationReporter>,
    parser: Arc<dyn HeaderParser>,
}

impl Default for KeyPinsBuilder {
    fn default() -> Self {
        Self {
            enforce: None,
            report_only: None,
            must_pin: false,
            reporter: Arc::new(LogReporter),
            parser: Arc::new(Rfc7469Parser),
        }
    }
}

impl KeyPinsBuilder {
    pub fn enforce(mut self, storage: Arc<dyn Storage>) -> Self {
        self.enforce = Some(storage);
        self
    }

    pub fn report_only(mut self, storage: Arc<dyn Storage>) -> Self {
        self.report_only = Some(storage);
        self
    }

    pub fn must_pin(mut self, must_pin: bool) -> Self {
        self.must_pin = must_pin;
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn ViolationReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn parser(mut self, parser: Arc<dyn HeaderParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn build(self) -> KeyPins {
        KeyPins {
            enforce: self.enforce,
            report_only: self.report_only,
            must_pin: self.must_pin,
            reporter: self.reporter,
            parser: self.parser,
        }
    }
}

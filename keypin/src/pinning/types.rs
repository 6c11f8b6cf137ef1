use crate::pinning::errors::PinError;
use crate::pinning::util::{decode_b64, sha256};
use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Size in bytes of a SHA-256 pin.
pub const FINGERPRINT_LEN: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// SHA-256 digest of a certificate's SubjectPublicKeyInfo encoding.
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    pub const fn new(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    /// Hashes a raw SubjectPublicKeyInfo encoding.
    pub fn of_spki(spki_der: &[u8]) -> Self {
        Self(sha256(spki_der))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, PinError> {
        let arr: [u8; FINGERPRINT_LEN] = bytes.try_into().map_err(|_| {
            PinError::Decode(format!(
                "fingerprint must be {FINGERPRINT_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Accepts plain or colon-separated hex, optionally prefixed with `sha256:`.
    pub fn from_hex(value: &str) -> Result<Self, PinError> {
        let trimmed = value.strip_prefix("sha256:").unwrap_or(value);
        let compact: String = trimmed.chars().filter(|c| *c != ':').collect();
        let bytes = hex::decode(compact).map_err(|e| PinError::Decode(format!("hex: {e}")))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&b64.encode(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

/// Parses the base64 `pin-sha256` form.
impl FromStr for Fingerprint {
    type Err = PinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_b64("pin-sha256", s.trim())?;
        Self::from_slice(&bytes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// A set of acceptable key fingerprints plus the scope and lifetime they apply to.
///
/// Values are replaced wholesale in storage and never mutated after resolution.
pub struct Pin {
    pub fingerprints: HashSet<Fingerprint>,
    /// `None` and the Unix epoch both mean the pin never expires.
    pub valid_until: Option<SystemTime>,
    pub include_subdomains: bool,
    /// Carried for violation reports; not interpreted here.
    pub report_uri: Option<String>,
}

impl Pin {
    pub fn new(fingerprints: impl IntoIterator<Item = Fingerprint>) -> Self {
        Self {
            fingerprints: fingerprints.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_expiry(mut self, valid_until: SystemTime) -> Self {
        self.valid_until = Some(valid_until);
        self
    }

    pub fn with_subdomains(mut self, include: bool) -> Self {
        self.include_subdomains = include;
        self
    }

    pub fn with_report_uri(mut self, uri: impl Into<String>) -> Self {
        self.report_uri = Some(uri.into());
        self
    }

    pub fn never_expires(&self) -> bool {
        match self.valid_until {
            None => true,
            Some(t) => t == UNIX_EPOCH,
        }
    }

    pub fn is_valid_at(&self, now: SystemTime) -> bool {
        if self.never_expires() {
            return true;
        }
        self.valid_until.map_or(true, |until| now < until)
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.fingerprints.contains(fingerprint)
    }

    /// Fingerprints in a stable order, for logs and reports.
    pub fn sorted_fingerprints(&self) -> Vec<Fingerprint> {
        let mut out: Vec<_> = self.fingerprints.iter().copied().collect();
        out.sort_unstable();
        out
    }
}

/// An absent pin is never valid.
pub fn is_valid(pin: Option<&Pin>, now: SystemTime) -> bool {
    pin.is_some_and(|p| p.is_valid_at(now))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Which pin category a check ran under.
pub enum PinMode {
    /// Mismatch blocks the connection.
    Enforce,
    /// Mismatch is reported only.
    ReportOnly,
}

impl PinMode {
    /// Response header that carries pins of this category.
    pub fn header_name(self) -> &'static str {
        match self {
            Self::Enforce => crate::pinning::header::ENFORCE_HEADER,
            Self::ReportOnly => crate::pinning::header::REPORT_ONLY_HEADER,
        }
    }
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enforce => f.write_str("enforce"),
            Self::ReportOnly => f.write_str("report-only"),
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Effective pins for one hostname, per category.
pub struct ResolvedPins {
    pub enforce: Option<Arc<Pin>>,
    pub report: Option<Arc<Pin>>,
}

impl ResolvedPins {
    pub fn is_empty(&self) -> bool {
        self.enforce.is_none() && self.report.is_none()
    }
}

use crate::pinning::types::{Fingerprint, Pin, PinMode};
use crate::pinning::util::unix_seconds;
use std::time::SystemTime;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Details of a chain that failed a pin check.
pub struct PinViolation {
    pub hostname: String,
    pub mode: PinMode,
    pub include_subdomains: bool,
    pub valid_until: Option<SystemTime>,
    pub report_uri: Option<String>,
    /// Fingerprints the pin accepts, sorted.
    pub known_pins: Vec<Fingerprint>,
    /// Fingerprints of the first verified chain, leaf first.
    pub served_chain: Vec<Fingerprint>,
}

impl PinViolation {
    pub fn new(hostname: &str, mode: PinMode, pin: &Pin, served_chain: Vec<Fingerprint>) -> Self {
        Self {
            hostname: hostname.to_owned(),
            mode,
            include_subdomains: pin.include_subdomains,
            valid_until: pin.valid_until,
            report_uri: pin.report_uri.clone(),
            known_pins: pin.sorted_fingerprints(),
            served_chain,
        }
    }
}

/// Side channel for pin violations. The result is never awaited and never
/// changes the verdict.
pub trait ViolationReporter: Send + Sync {
    fn report(&self, violation: &PinViolation);
}

#[derive(Debug, Default, Clone, Copy)]
/// Emits each violation as a `tracing` warning.
pub struct LogReporter;

impl ViolationReporter for LogReporter {
    fn report(&self, violation: &PinViolation) {
        let served: Vec<String> = violation
            .served_chain
            .iter()
            .map(ToString::to_string)
            .collect();
        warn!(
            host = %violation.hostname,
            mode = %violation.mode,
            include_subdomains = violation.include_subdomains,
            valid_until = violation.valid_until.map(unix_seconds),
            report_uri = violation.report_uri.as_deref().unwrap_or(""),
            served = ?served,
            "public key pin violation"
        );
    }
}

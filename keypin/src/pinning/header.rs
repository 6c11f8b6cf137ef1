//! `Public-Key-Pins` header parsing (RFC 7469 §2.1).

use crate::pinning::errors::PinError;
use crate::pinning::types::{Fingerprint, Pin};
use std::time::{Duration, SystemTime};

pub const ENFORCE_HEADER: &str = "Public-Key-Pins";
pub const REPORT_ONLY_HEADER: &str = "Public-Key-Pins-Report-Only";

/// Maps a raw pinning header value to a pin.
///
/// An empty value yields `Ok(None)`, meaning "no pin for this host".
pub trait HeaderParser: Send + Sync {
    fn parse(&self, value: &str, now: SystemTime) -> Result<Option<Pin>, PinError>;
}

#[derive(Debug, Default, Clone, Copy)]
/// Parser for the RFC 7469 directive grammar.
///
/// `max-age=0` parses to `None`, which removes any stored pin for the host.
/// Unknown directives, including pins for other hash algorithms, are ignored.
pub struct Rfc7469Parser;

impl HeaderParser for Rfc7469Parser {
    fn parse(&self, value: &str, now: SystemTime) -> Result<Option<Pin>, PinError> {
        if value.trim().is_empty() {
            return Ok(None);
        }

        let mut fingerprints = Vec::new();
        let mut max_age = None;
        let mut include_subdomains = false;
        let mut report_uri = None;

        for directive in directives(value)? {
            let (name, arg) = match directive.split_once('=') {
                Some((name, arg)) => (name.trim(), Some(unquote(arg.trim())?)),
                None => (directive, None),
            };

            if name.eq_ignore_ascii_case("pin-sha256") {
                let arg = required(name, arg)?;
                let fp = arg
                    .parse::<Fingerprint>()
                    .map_err(|e| PinError::Header(e.to_string()))?;
                fingerprints.push(fp);
            } else if name.eq_ignore_ascii_case("max-age") {
                if max_age.is_some() {
                    return Err(PinError::Header("duplicate max-age directive".into()));
                }
                max_age = Some(parse_max_age(required(name, arg)?)?);
            } else if name.eq_ignore_ascii_case("includeSubDomains") {
                if arg.is_some() {
                    return Err(PinError::Header("includeSubDomains takes no value".into()));
                }
                if include_subdomains {
                    return Err(PinError::Header(
                        "duplicate includeSubDomains directive".into(),
                    ));
                }
                include_subdomains = true;
            } else if name.eq_ignore_ascii_case("report-uri") {
                if report_uri.is_some() {
                    return Err(PinError::Header("duplicate report-uri directive".into()));
                }
                report_uri = Some(required(name, arg)?.to_owned());
            }
        }

        let max_age = max_age.ok_or_else(|| PinError::Header("missing max-age directive".into()))?;
        if fingerprints.is_empty() {
            return Err(PinError::Header("no pin-sha256 directives".into()));
        }
        if max_age == 0 {
            return Ok(None);
        }

        let valid_until = now
            .checked_add(Duration::from_secs(max_age))
            .ok_or_else(|| PinError::Header(format!("max-age {max_age} out of range")))?;

        Ok(Some(Pin {
            fingerprints: fingerprints.into_iter().collect(),
            valid_until: Some(valid_until),
            include_subdomains,
            report_uri,
        }))
    }
}

/// Splits on `;` outside quoted strings, dropping empty directives.
fn directives(value: &str) -> Result<Vec<&str>, PinError> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (idx, c) in value.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ';' if !quoted => {
                out.push(&value[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if quoted {
        return Err(PinError::Header(format!(
            "unterminated quoted value: {}",
            value[start..].trim()
        )));
    }
    out.push(&value[start..]);
    Ok(out
        .into_iter()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .collect())
}

fn unquote(arg: &str) -> Result<&str, PinError> {
    match arg.strip_prefix('"') {
        Some(rest) => rest
            .strip_suffix('"')
            .ok_or_else(|| PinError::Header(format!("unterminated quoted value: {arg}"))),
        None => Ok(arg),
    }
}

fn required<'a>(name: &str, arg: Option<&'a str>) -> Result<&'a str, PinError> {
    arg.filter(|a| !a.is_empty())
        .ok_or_else(|| PinError::Header(format!("{name} requires a value")))
}

fn parse_max_age(arg: &str) -> Result<u64, PinError> {
    if !arg.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PinError::Header(format!("max-age is not a number: {arg}")));
    }
    arg.parse()
        .map_err(|e| PinError::Header(format!("max-age {arg}: {e}")))
}

use crate::pinning::errors::PinError;
use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use ring::digest::{digest, SHA256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use x509_parser::prelude::*;

/// SHA-256 of `data` as a fixed-size array.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let d = digest(&SHA256, data);
    let mut out = [0u8; 32];
    out.copy_from_slice(d.as_ref());
    out
}

/// Returns the raw SubjectPublicKeyInfo encoding embedded in a DER certificate.
pub fn spki_der(cert_der: &[u8]) -> Result<&[u8], PinError> {
    let (_, cert) = parse_x509_certificate(cert_der)
        .map_err(|e| PinError::Certificate(format!("parse x509 der: {e}")))?;
    Ok(cert.tbs_certificate.subject_pki.raw)
}

/// Wraps `contents` in a DER SEQUENCE header.
///
/// Trust anchors carry the SubjectPublicKeyInfo body only; wrapping restores
/// the encoding that `pin-sha256` hashes.
pub fn der_sequence(contents: &[u8]) -> Vec<u8> {
    let len = contents.len();
    let mut out = Vec::with_capacity(len + 2 + std::mem::size_of::<usize>());
    out.push(0x30);
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let be = len.to_be_bytes();
        let skip = be.iter().take_while(|b| **b == 0).count();
        out.push(0x80 | (be.len() - skip) as u8);
        out.extend_from_slice(&be[skip..]);
    }
    out.extend_from_slice(contents);
    out
}

/// Base64-decodes `value`, tagging errors with the provided label.
pub fn decode_b64(label: &str, value: &str) -> Result<Vec<u8>, PinError> {
    b64.decode(value.as_bytes())
        .map_err(|e| PinError::Decode(format!("{label}: {e}")))
}

/// Seconds since the Unix epoch, clamped to zero for earlier instants.
pub fn unix_seconds(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

pub fn from_unix_seconds(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn decode_b64_labels_errors() {
        let err = decode_b64("pin-sha256", "***").unwrap_err();
        assert!(err.to_string().contains("pin-sha256"));
    }

    #[test]
    fn spki_der_rejects_garbage() {
        assert!(matches!(
            spki_der(&[0x30, 0x03, 0x01]),
            Err(PinError::Certificate(_))
        ));
    }

    #[test]
    fn der_sequence_encodes_short_and_long_lengths() {
        assert_eq!(der_sequence(&[1, 2, 3]), vec![0x30, 0x03, 1, 2, 3]);

        let medium = der_sequence(&[0u8; 200]);
        assert_eq!(&medium[..3], &[0x30, 0x81, 200]);
        assert_eq!(medium.len(), 203);

        let long = der_sequence(&[0u8; 300]);
        assert_eq!(&long[..4], &[0x30, 0x82, 0x01, 0x2c]);
        assert_eq!(long.len(), 304);
    }

    #[test]
    fn unix_seconds_round_trip_epoch() {
        assert_eq!(from_unix_seconds(0), UNIX_EPOCH);
        assert_eq!(unix_seconds(from_unix_seconds(1_700_000_000)), 1_700_000_000);
    }
}

use crate::pinning::errors::PinError;
use crate::pinning::storage::MemStorage;
use crate::pinning::types::{Fingerprint, Pin};
use crate::pinning::util::from_unix_seconds;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
/// Static pin policy, typically loaded from a JSON file.
pub struct PinningConfig {
    /// Reject hosts that resolve no enforce pin.
    pub must_pin: bool,
    /// Enforced pins per exact hostname. `None` disables the category.
    pub enforce: Option<BTreeMap<String, PinEntry>>,
    /// Report-only pins per exact hostname. `None` disables the category.
    pub report_only: Option<BTreeMap<String, PinEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// One configured pin.
pub struct PinEntry {
    /// Base64 SHA-256 SPKI fingerprints, as in `pin-sha256`.
    pub pin_sha256: Vec<String>,
    /// Expiry in Unix seconds; absent or 0 never expires.
    #[serde(default)]
    pub expires_at: Option<u64>,
    #[serde(default)]
    pub include_subdomains: bool,
    #[serde(default)]
    pub report_uri: Option<String>,
}

impl PinEntry {
    pub fn to_pin(&self) -> Result<Pin, PinError> {
        let fingerprints = self
            .pin_sha256
            .iter()
            .map(|fp| {
                fp.parse::<Fingerprint>()
                    .map_err(|e| PinError::Config(e.to_string()))
            })
            .collect::<Result<HashSet<_>, PinError>>()?;
        Ok(Pin {
            fingerprints,
            valid_until: self.expires_at.map(from_unix_seconds),
            include_subdomains: self.include_subdomains,
            report_uri: self.report_uri.clone(),
        })
    }
}

impl PinningConfig {
    pub fn from_json(json: &str) -> Result<Self, PinError> {
        serde_json::from_str(json).map_err(|e| PinError::Config(format!("json: {e}")))
    }

    /// Reads and parses a JSON pin file.
    pub fn load_from_file(path: &Path) -> Result<Self, PinError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PinError::Config(format!("read {path:?}: {e}")))?;
        Self::from_json(&contents)
    }

    pub fn enforce_storage(&self) -> Result<Option<MemStorage>, PinError> {
        self.enforce.as_ref().map(build_storage).transpose()
    }

    pub fn report_only_storage(&self) -> Result<Option<MemStorage>, PinError> {
        self.report_only.as_ref().map(build_storage).transpose()
    }
}

fn build_storage(entries: &BTreeMap<String, PinEntry>) -> Result<MemStorage, PinError> {
    entries
        .iter()
        .map(|(host, entry)| {
            let pin = entry
                .to_pin()
                .map_err(|e| PinError::Config(format!("{host}: {e}")))?;
            Ok((host.clone(), pin))
        })
        .collect::<Result<Vec<_>, PinError>>()
        .map(|pins| pins.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pinning::storage::Storage;
    use std::time::UNIX_EPOCH;

    const PIN_A: &str = "d6qzRu9zOECb90Uez27xWltNsj0e1Md7GkYYkVoZWmM=";

    #[test]
    fn parses_pin_file() {
        let cfg = PinningConfig::from_json(&format!(
            r#"{{
                "must_pin": true,
                "enforce": {{
                    "example.com": {{
                        "pin_sha256": ["{PIN_A}"],
                        "include_subdomains": true,
                        "expires_at": 0
                    }}
                }}
            }}"#
        ))
        .unwrap();

        assert!(cfg.must_pin);
        assert!(cfg.report_only.is_none());
        assert!(cfg.report_only_storage().unwrap().is_none());

        let store = cfg.enforce_storage().unwrap().unwrap();
        let pin = store.get("example.com").unwrap().unwrap();
        assert!(pin.include_subdomains);
        assert_eq!(pin.valid_until, Some(UNIX_EPOCH));
        assert!(pin.never_expires());
        assert!(pin.contains(&PIN_A.parse().unwrap()));
    }

    #[test]
    fn empty_document_disables_everything() {
        let cfg = PinningConfig::from_json("{}").unwrap();
        assert!(!cfg.must_pin);
        assert!(cfg.enforce_storage().unwrap().is_none());
        assert!(cfg.report_only_storage().unwrap().is_none());
    }

    #[test]
    fn empty_map_attaches_empty_storage() {
        let cfg = PinningConfig::from_json(r#"{"report_only": {}}"#).unwrap();
        assert!(cfg.report_only_storage().unwrap().unwrap().is_empty());
    }

    #[test]
    fn bad_fingerprint_names_the_host() {
        let cfg = PinningConfig::from_json(
            r#"{"enforce": {"bad.example": {"pin_sha256": ["not-base64!"]}}}"#,
        )
        .unwrap();
        let err = cfg.enforce_storage().unwrap_err();
        assert!(matches!(err, PinError::Config(ref m) if m.contains("bad.example")));
    }

    #[test]
    fn load_from_missing_file_fails() {
        let err = PinningConfig::load_from_file(Path::new("/nonexistent/pins.json")).unwrap_err();
        assert!(matches!(err, PinError::Config(_)));
    }
}

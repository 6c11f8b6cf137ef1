use crate::pinning::errors::PinError;
use crate::pinning::types::Fingerprint;
use crate::pinning::util::spki_der;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
/// One chain already validated by the transport, leaf first, reduced to the
/// raw SubjectPublicKeyInfo of each certificate.
pub struct VerifiedChain<'a> {
    spkis: Vec<&'a [u8]>,
}

impl<'a> VerifiedChain<'a> {
    /// Extracts the SPKI of every DER certificate in order.
    pub fn from_der<C: AsRef<[u8]>>(certs: &'a [C]) -> Result<Self, PinError> {
        let spkis = certs
            .iter()
            .map(|cert| spki_der(cert.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { spkis })
    }

    pub fn from_spkis(spkis: Vec<&'a [u8]>) -> Self {
        Self { spkis }
    }

    pub fn spkis(&self) -> &[&'a [u8]] {
        &self.spkis
    }

    pub fn len(&self) -> usize {
        self.spkis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spkis.is_empty()
    }
}

#[derive(Debug, Default)]
/// Fingerprint memo for a single verification call, keyed by raw SPKI bytes.
pub struct FingerprintCache<'a> {
    entries: HashMap<&'a [u8], Fingerprint>,
}

impl<'a> FingerprintCache<'a> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub fn fingerprint(&mut self, spki: &'a [u8]) -> Fingerprint {
        *self
            .entries
            .entry(spki)
            .or_insert_with(|| Fingerprint::of_spki(spki))
    }

    /// Number of distinct keys hashed so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fingerprints of `chain` in order, reusing cached digests.
    pub fn chain_fingerprints(&mut self, chain: &VerifiedChain<'a>) -> Vec<Fingerprint> {
        chain
            .spkis
            .iter()
            .map(|spki| self.fingerprint(*spki))
            .collect()
    }
}

/// True when any certificate of any chain carries a pinned key.
///
/// An empty pin set never matches; callers treat that as "no pin", not as a
/// failed check.
pub fn matches<'a>(
    chains: &[VerifiedChain<'a>],
    pins: &HashSet<Fingerprint>,
    cache: &mut FingerprintCache<'a>,
) -> bool {
    if pins.is_empty() {
        return false;
    }
    chains
        .iter()
        .flat_map(|chain| chain.spkis.iter())
        .any(|spki| pins.contains(&cache.fingerprint(*spki)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEAF: &[u8] = b"leaf-spki";
    const INTERMEDIATE: &[u8] = b"intermediate-spki";
    const ROOT: &[u8] = b"root-spki";

    fn pins(spkis: &[&[u8]]) -> HashSet<Fingerprint> {
        spkis.iter().map(|s| Fingerprint::of_spki(s)).collect()
    }

    #[test]
    fn empty_pin_set_never_matches() {
        let chains = vec![VerifiedChain::from_spkis(vec![LEAF, ROOT])];
        let mut cache = FingerprintCache::default();
        assert!(!matches(&chains, &HashSet::new(), &mut cache));
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_chains_never_match() {
        let mut cache = FingerprintCache::default();
        assert!(!matches(&[], &pins(&[LEAF]), &mut cache));
    }

    #[test]
    fn matches_any_position_in_any_chain() {
        let chains = vec![
            VerifiedChain::from_spkis(vec![LEAF, INTERMEDIATE]),
            VerifiedChain::from_spkis(vec![LEAF, ROOT]),
        ];
        let mut cache = FingerprintCache::default();
        assert!(matches(&chains, &pins(&[LEAF]), &mut cache));
        assert!(matches(&chains, &pins(&[INTERMEDIATE]), &mut cache));
        assert!(matches(&chains, &pins(&[ROOT]), &mut cache));
        assert!(!matches(&chains, &pins(&[b"other".as_slice()]), &mut cache));
    }

    #[test]
    fn cache_hashes_each_key_once() {
        let chains = vec![
            VerifiedChain::from_spkis(vec![LEAF, INTERMEDIATE, ROOT]),
            VerifiedChain::from_spkis(vec![LEAF, ROOT]),
        ];
        let mut cache = FingerprintCache::with_capacity(3);
        assert!(!matches(&chains, &pins(&[b"other".as_slice()]), &mut cache));
        assert_eq!(cache.len(), 3);
        assert!(!matches(&chains, &pins(&[b"another".as_slice()]), &mut cache));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn chain_fingerprints_are_ordered() {
        let chain = VerifiedChain::from_spkis(vec![LEAF, ROOT]);
        let mut cache = FingerprintCache::default();
        assert_eq!(
            cache.chain_fingerprints(&chain),
            vec![Fingerprint::of_spki(LEAF), Fingerprint::of_spki(ROOT)]
        );
    }

    #[test]
    fn from_der_rejects_undecodable_certificates() {
        let certs = vec![vec![0u8, 1, 2]];
        assert!(matches!(
            VerifiedChain::from_der(&certs[..]),
            Err(PinError::Certificate(_))
        ));
    }
}

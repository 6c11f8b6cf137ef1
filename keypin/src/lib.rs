//! Public key pinning for TLS clients.
//!
//! Pins are stored per exact hostname behind the [`pinning::Storage`]
//! capability, resolved hierarchically (an ancestor pin applies to a
//! descendant only when it declared `includeSubDomains`), and enforced
//! against the chains a TLS stack has already verified.

pub mod pinning;

use crate::pinning::errors::PinError;
use crate::pinning::storage::Storage;
use crate::pinning::types::{Pin, ResolvedPins};
use std::sync::Arc;
use tracing::debug;

/// Proper parent domains of `host`, nearest first.
///
/// `"a.b.c"` yields `"b.c"` then `"c"`. The host itself is never yielded
/// and neither is the empty string.
pub fn parent_domains(host: &str) -> impl Iterator<Item = &str> {
    host.match_indices('.')
        .map(move |(idx, _)| &host[idx + 1..])
        .filter(|candidate| !candidate.is_empty())
}

/// Effective pin for `host` in a single store.
///
/// An exact entry always applies. Otherwise the nearest ancestor entry that
/// declared `include_subdomains` applies; ancestors without the flag are
/// skipped and the walk continues outward.
pub fn resolve(host: &str, storage: &dyn Storage) -> Result<Option<Arc<Pin>>, PinError> {
    if let Some(pin) = storage.get(host)? {
        return Ok(Some(pin));
    }

    for candidate in parent_domains(host) {
        if let Some(pin) = inherited(storage, candidate)? {
            debug!(host = %host, from = %candidate, "inherited pin from parent domain");
            return Ok(Some(pin));
        }
    }

    Ok(None)
}

/// Resolves both categories in one walk, stopping once every configured
/// store has produced a pin. A `None` store disables its category.
pub fn resolve_pair(
    host: &str,
    enforce: Option<&dyn Storage>,
    report: Option<&dyn Storage>,
) -> Result<ResolvedPins, PinError> {
    let mut resolved = ResolvedPins {
        enforce: lookup(enforce, host)?,
        report: lookup(report, host)?,
    };

    if settled(enforce, &resolved.enforce) && settled(report, &resolved.report) {
        return Ok(resolved);
    }

    for candidate in parent_domains(host) {
        if let Some(storage) = enforce.filter(|_| resolved.enforce.is_none()) {
            resolved.enforce = inherited(storage, candidate)?;
        }
        if let Some(storage) = report.filter(|_| resolved.report.is_none()) {
            resolved.report = inherited(storage, candidate)?;
        }
        if settled(enforce, &resolved.enforce) && settled(report, &resolved.report) {
            break;
        }
    }

    debug!(
        host = %host,
        enforce = resolved.enforce.is_some(),
        report = resolved.report.is_some(),
        "resolved pins"
    );
    Ok(resolved)
}

fn lookup(storage: Option<&dyn Storage>, host: &str) -> Result<Option<Arc<Pin>>, PinError> {
    match storage {
        Some(storage) => Ok(storage.get(host)?),
        None => Ok(None),
    }
}

/// An ancestor entry only counts when it covers subdomains.
fn inherited(storage: &dyn Storage, candidate: &str) -> Result<Option<Arc<Pin>>, PinError> {
    Ok(storage.get(candidate)?.filter(|pin| pin.include_subdomains))
}

fn settled(storage: Option<&dyn Storage>, pin: &Option<Arc<Pin>>) -> bool {
    storage.is_none() || pin.is_some()
}

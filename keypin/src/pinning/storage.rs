use crate::pinning::errors::StorageError;
use crate::pinning::types::Pin;
use dashmap::DashMap;
use std::sync::Arc;

/// Exact-match hostname → pin store.
///
/// Implementations must be safe to call concurrently without external
/// locking. Keys are used verbatim; callers normalise case and trailing
/// dots before calling. Hierarchy is resolved by
/// [`resolve`](super::resolve), never by the store.
pub trait Storage: Send + Sync {
    fn get(&self, host: &str) -> Result<Option<Arc<Pin>>, StorageError>;
    fn set(&self, host: &str, pin: Pin) -> Result<(), StorageError>;
    fn remove(&self, host: &str) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get(&self, host: &str) -> Result<Option<Arc<Pin>>, StorageError> {
        (**self).get(host)
    }

    fn set(&self, host: &str, pin: Pin) -> Result<(), StorageError> {
        (**self).set(host, pin)
    }

    fn remove(&self, host: &str) -> Result<(), StorageError> {
        (**self).remove(host)
    }
}

#[derive(Debug, Default)]
/// In-memory store backed by a sharded concurrent map.
pub struct MemStorage {
    pins: DashMap<String, Arc<Pin>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

impl Storage for MemStorage {
    fn get(&self, host: &str) -> Result<Option<Arc<Pin>>, StorageError> {
        Ok(self.pins.get(host).map(|entry| Arc::clone(entry.value())))
    }

    fn set(&self, host: &str, pin: Pin) -> Result<(), StorageError> {
        self.pins.insert(host.to_owned(), Arc::new(pin));
        Ok(())
    }

    fn remove(&self, host: &str) -> Result<(), StorageError> {
        self.pins.remove(host);
        Ok(())
    }
}

impl<H: Into<String>> FromIterator<(H, Pin)> for MemStorage {
    fn from_iter<I: IntoIterator<Item = (H, Pin)>>(iter: I) -> Self {
        let pins = iter
            .into_iter()
            .map(|(host, pin)| (host.into(), Arc::new(pin)))
            .collect();
        Self { pins }
    }
}

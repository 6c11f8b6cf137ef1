use thiserror::Error;

#[derive(Debug, Error)]
/// Failure taxonomy for pin application and peer verification.
pub enum PinError {
    #[error("malformed pinning header: {0}")]
    Header(String),
    #[error("pin storage: {0}")]
    Storage(#[from] StorageError),
    #[error("no verified certificate chain presented; pinning cannot be evaluated")]
    UnverifiedChain,
    #[error("missing pins for host {host}")]
    MissingPins { host: String },
    #[error("certificate chain presented for {host} matches no pinned key")]
    PinMismatch { host: String },
    #[error("certificate decode failed: {0}")]
    Certificate(String),
    #[error("invalid pin configuration: {0}")]
    Config(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl PinError {
    /// The transport handed over no verified chain.
    pub fn is_trust_failure(&self) -> bool {
        matches!(self, Self::UnverifiedChain)
    }

    /// The chain was evaluated and rejected by pin policy.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::PinMismatch { .. } | Self::MissingPins { .. })
    }
}

#[derive(Debug, Error)]
#[error(transparent)]
/// Opaque error surfaced by a [`Storage`](super::Storage) backend.
pub struct StorageError(Box<dyn std::error::Error + Send + Sync>);

impl StorageError {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self(err.into())
    }
}

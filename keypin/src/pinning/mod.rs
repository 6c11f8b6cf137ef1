pub mod config;
pub mod errors;
pub mod header;
pub mod report;
pub mod resolver;
pub mod storage;
pub mod tls;
pub mod types;
pub mod util;
pub mod verifier;

mod chain;

pub use chain::{matches, FingerprintCache, VerifiedChain};
pub use config::{PinEntry, PinningConfig};
pub use errors::{PinError, StorageError};
pub use header::{HeaderParser, Rfc7469Parser, ENFORCE_HEADER, REPORT_ONLY_HEADER};
pub use report::{LogReporter, PinViolation, ViolationReporter};
pub use resolver::{resolve, resolve_pair};
pub use storage::{MemStorage, Storage};
pub use tls::PinningServerVerifier;
pub use types::{is_valid, Fingerprint, Pin, PinMode, ResolvedPins};
pub use verifier::{KeyPins, KeyPinsBuilder};

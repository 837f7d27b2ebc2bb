//! Error types for the metrics store.

use thiserror::Error;
use warpscale_core::ScaleError;

/// Result type alias for metrics store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during metrics store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),
}

/// Keeps the `StateError` reachable through `source()` so callers can
/// downcast and tell open, transaction and table failures apart.
impl From<StateError> for ScaleError {
    fn from(e: StateError) -> Self {
        ScaleError::Storage(Box::new(e))
    }
}

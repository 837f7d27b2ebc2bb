//! Error types for WarpScale.

use thiserror::Error;

use crate::types::MonitorId;

/// Boxed error carried as the source of a storage failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for scale operations.
pub type ScaleResult<T> = Result<T, ScaleError>;

/// Coarse classification of a [`ScaleError`].
///
/// The sampling loop isolates everything except `Unrecoverable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operational failure; retrying on the next tick is reasonable.
    Transient,
    /// A monitor failed to produce metrics or a vote.
    MonitorFailure,
    /// The process is compromised and the loop must not continue.
    Unrecoverable,
}

/// Errors raised by monitors, registries, stores, and the scale loops.
#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("monitor {monitor} failed: {message}")]
    Monitor { monitor: MonitorId, message: String },

    #[error("metrics store error: {0}")]
    Store(String),

    /// A storage backend failure; the backend's own error is the source.
    #[error("metrics store error: {0}")]
    Storage(#[source] BoxError),

    #[error("monitor registry error: {0}")]
    Registry(String),

    #[error("monitor already registered: {0}")]
    DuplicateMonitor(MonitorId),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("scale monitor service has been disposed")]
    Disposed,

    #[error("unrecoverable failure: {0}")]
    Unrecoverable(String),
}

impl ScaleError {
    /// Convenience constructor for monitor failures.
    pub fn monitor(monitor: &MonitorId, message: impl Into<String>) -> Self {
        Self::Monitor {
            monitor: monitor.clone(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ScaleError::Monitor { .. } => ErrorKind::MonitorFailure,
            ScaleError::Unrecoverable(_) => ErrorKind::Unrecoverable,
            ScaleError::Store(_)
            | ScaleError::Storage(_)
            | ScaleError::Registry(_)
            | ScaleError::DuplicateMonitor(_)
            | ScaleError::Config(_)
            | ScaleError::Disposed => ErrorKind::Transient,
        }
    }

    /// Whether this error must escape the sampling loop.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Unrecoverable
    }
}

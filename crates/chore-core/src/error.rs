use thiserror::Error;

/// Top-level error type for ChoreHub.
#[derive(Debug, Error)]
pub enum ChoreError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Database/storage error.
    #[error("store error: {0}")]
    Store(String),

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Input rejected at the API boundary.
    #[error("validation error: {0}")]
    Validation(String),

    /// The request conflicts with the current state (e.g. completing twice).
    #[error("conflict: {0}")]
    Conflict(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! Engine error types.
//!
//! [`EngineError`] is the single error type returned by every fallible
//! engine operation. Every variant is scoped to one request; none of them
//! is fatal to the process. Messages carry the operation and key involved
//! but never a password or token value.

use tokenlease_models::{ModelError, Operation};

use crate::storage::StorageError;

/// Error type for all engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A config or role write failed validation; nothing was persisted.
    #[error("validation failed: {0}")]
    Validation(ModelError),

    /// A resource required by the operation does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Credentials were requested before the backend was configured, or the
    /// stored configuration cannot build a client.
    #[error("backend not configured: {0}")]
    Configuration(String),

    /// The external service rejected or failed a sign-in / sign-out.
    #[error("external service error: {0}")]
    Upstream(String),

    /// A malformed identifier, such as an empty role name.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying store failed.
    #[error("storage error during {operation} {key}: {source}")]
    Storage {
        /// What the engine was doing (`read`, `write`, `delete`, `list`).
        operation: &'static str,
        /// The key involved.
        key: String,
        /// Underlying failure.
        #[source]
        source: StorageError,
    },

    /// The caller cancelled the request before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// The path exists but does not handle the requested operation.
    #[error("unsupported operation {operation} on {path}")]
    UnsupportedOperation {
        /// Requested operation.
        operation: Operation,
        /// Requested path.
        path: String,
    },
}

impl EngineError {
    /// Wrap a storage failure with the operation and key it happened on.
    pub fn storage(operation: &'static str, key: impl Into<String>, source: StorageError) -> Self {
        Self::Storage {
            operation,
            key: key.into(),
            source,
        }
    }
}

impl From<ModelError> for EngineError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::InvalidRoleName { .. } => Self::InvalidArgument(e.to_string()),
            other => Self::Validation(other),
        }
    }
}

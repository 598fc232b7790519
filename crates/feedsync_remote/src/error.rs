//! Error types for remote store operations.

use thiserror::Error;

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors that can occur against the remote document store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The requested document does not exist.
    #[error("document not found: {collection}/{id}")]
    NotFound {
        /// Collection searched.
        collection: &'static str,
        /// Document id.
        id: String,
    },

    /// The caller is not allowed to perform this operation.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Description of the denial.
        message: String,
    },

    /// The store is unreachable or the request timed out.
    #[error("remote unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// A transaction's read set was invalidated by a concurrent commit.
    #[error("transaction conflict on {collection}/{id}")]
    Conflict {
        /// Collection of the conflicting document.
        collection: &'static str,
        /// Id of the conflicting document.
        id: String,
    },

    /// The request was malformed.
    #[error("invalid request: {message}")]
    Invalid {
        /// Description of the problem.
        message: String,
    },
}

impl RemoteError {
    /// Creates a not-found error.
    pub fn not_found(collection: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection,
            id: id.into(),
        }
    }

    /// Creates a permission-denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(collection: &'static str, id: impl Into<String>) -> Self {
        Self::Conflict {
            collection,
            id: id.into(),
        }
    }

    /// Creates an invalid-request error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Returns true if retrying the operation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::Unavailable { .. } | RemoteError::Conflict { .. }
        )
    }
}

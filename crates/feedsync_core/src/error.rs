//! Error taxonomy for sync operations.

use feedsync_remote::RemoteError;
use feedsync_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by repositories.
///
/// Local-cache reads never fail outward; absence is "no data yet".
/// Remote refresh and mutation failures come back as one of these
/// variants, and the caller decides whether to surface or swallow them.
/// Toggle-style mutations swallow remote failures by design.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No authenticated user for an operation that requires one.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The entity does not exist remotely.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity.
        entity: &'static str,
        /// Entity id.
        id: String,
    },

    /// The remote store rejected the operation.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Description of the denial.
        message: String,
    },

    /// The remote store is unreachable.
    #[error("network error: {message}")]
    Network {
        /// Description of the failure.
        message: String,
    },

    /// A counter transaction exhausted its retry budget.
    #[error("transaction conflict after {attempts} attempts")]
    TransactionConflict {
        /// Number of attempts made.
        attempts: u32,
    },

    /// The mutation intent was invalid (e.g. self-follow, empty field).
    #[error("validation error: {message}")]
    Validation {
        /// Description of the problem.
        message: String,
    },

    /// Local cache encode/decode failure.
    #[error("local store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Creates a not-found error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a conflict-exhaustion error.
    pub fn conflict(attempts: u32) -> Self {
        Self::TransactionConflict { attempts }
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound { collection, id } => SyncError::NotFound {
                entity: collection,
                id,
            },
            RemoteError::PermissionDenied { message } => SyncError::PermissionDenied { message },
            RemoteError::Unavailable { message } => SyncError::Network { message },
            RemoteError::Conflict { .. } => SyncError::TransactionConflict { attempts: 1 },
            RemoteError::Invalid { message } => SyncError::Validation { message },
        }
    }
}

//! Error types for the local store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in local store operations.
///
/// Note that plain reads never produce an error: a missing row is `None`.
/// Errors here come from the typed encode/decode seam.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row could not be encoded into its stored document form.
    #[error("encode error in table {table}: {message}")]
    Encode {
        /// Table the row belongs to.
        table: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// A stored document could not be decoded into its entity type.
    #[error("decode error in table {table}: {message}")]
    Decode {
        /// Table the row belongs to.
        table: &'static str,
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates an encode error.
    pub fn encode(table: &'static str, message: impl Into<String>) -> Self {
        Self::Encode {
            table,
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(table: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            table,
            message: message.into(),
        }
    }
}

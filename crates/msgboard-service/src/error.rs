//! Errors surfaced by the message service.

use msgboard_store::StoreError;
use thiserror::Error;

/// Result type for service operations.
pub type BoardResult<T> = Result<T, BoardError>;

/// Errors that can occur in message service operations.
#[derive(Debug, Error)]
pub enum BoardError {
    /// No message is stored under the id.
    #[error("message not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    /// Caller input failed validation.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was wrong with it.
        reason: String,
    },

    /// The underlying store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A stored record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl BoardError {
    pub(crate) fn not_found(id: &str) -> Self {
        BoardError::NotFound { id: id.to_string() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BoardError::NotFound { .. })
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, BoardError::InvalidInput { .. })
    }
}

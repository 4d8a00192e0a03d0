//! Error types for backend operations.

use std::io;
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur during backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A stored document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The named collection does not exist.
    #[error("collection not found: {name}")]
    CollectionNotFound {
        /// The missing collection.
        name: String,
    },

    /// The collection name cannot be used by this backend.
    #[error("invalid collection name: {name:?}")]
    InvalidCollectionName {
        /// The rejected name.
        name: String,
    },

    /// The backend refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Creates a collection-not-found error.
    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound { name: name.into() }
    }

    /// Creates a rejection error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Creates an unavailability error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Returns `true` if the error reports a missing collection.
    #[must_use]
    pub fn is_collection_not_found(&self) -> bool {
        matches!(self, Self::CollectionNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_not_found_is_detected() {
        let err = BackendError::collection_not_found("books");
        assert!(err.is_collection_not_found());
        assert_eq!(err.to_string(), "collection not found: books");
    }

    #[test]
    fn other_errors_are_not_missing_collections() {
        assert!(!BackendError::rejected("nope").is_collection_not_found());
        assert!(!BackendError::unavailable("down").is_collection_not_found());
    }
}

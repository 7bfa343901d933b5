//! Error types for the shared store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur talking to the shared store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Network or transport failure.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The record exists but fails basic shape validation.
    #[error("corrupt remote record: {reason}")]
    Corrupt {
        /// Description of the corruption.
        reason: String,
    },
}

impl StoreError {
    /// Creates a retryable unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable unavailable error.
    pub fn unavailable_fatal(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a corrupt-record error.
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::Corrupt {
            reason: reason.into(),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Unavailable { retryable, .. } => *retryable,
            StoreError::Corrupt { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability() {
        assert!(StoreError::unavailable("offline").is_retryable());
        assert!(!StoreError::unavailable_fatal("bad certificate").is_retryable());
        assert!(!StoreError::corrupt("missing version").is_retryable());
    }

    #[test]
    fn display() {
        let err = StoreError::corrupt("missing version");
        assert_eq!(err.to_string(), "corrupt remote record: missing version");
    }
}

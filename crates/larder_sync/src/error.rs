//! Error types for the sync engine.

use crate::cache::CacheError;
use larder_protocol::Version;
use larder_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// Not every variant is a fault: [`SyncError::StaleWrite`] is the
/// expected signal that another device wrote first and is routed into
/// the conflict workflow rather than reported as a failure. No error
/// path discards local edits.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network or transport failure; pending changes are preserved.
    #[error("remote store unavailable: {message}")]
    RemoteUnavailable {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// A push was rejected because the stored version is newer than the
    /// version this device last observed.
    #[error("stale write: remote record is at version {current_version}")]
    StaleWrite {
        /// The version currently stored remotely.
        current_version: Version,
    },

    /// The access code was revoked; the session has been torn down.
    #[error("session invalidated: access code was revoked")]
    SessionInvalidated,

    /// The supplied secret does not match the stored credential hash,
    /// or no hash is stored. Nothing was mutated.
    #[error("credential rejected")]
    CredentialRejected,

    /// The remote record exists but fails shape validation. Local state
    /// is never discarded in response.
    #[error("corrupt remote record: {reason}")]
    CorruptRemote {
        /// Description of the corruption.
        reason: String,
    },

    /// The operation needs an active session.
    #[error("no active session")]
    NoSession,

    /// A session is already active.
    #[error("a session is already active")]
    SessionActive,

    /// The operation needs a pending conflict.
    #[error("no conflict pending")]
    NoConflict,

    /// The local durable cache failed.
    #[error("replica cache error: {0}")]
    Cache(#[from] CacheError),
}

impl SyncError {
    /// Returns true if retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteUnavailable {
                retryable: true,
                ..
            }
        )
    }

    /// Returns true if this error ends the current session.
    pub fn is_session_ending(&self) -> bool {
        matches!(self, SyncError::SessionInvalidated)
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { message, retryable } => {
                SyncError::RemoteUnavailable { message, retryable }
            }
            StoreError::Corrupt { reason } => SyncError::CorruptRemote { reason },
        }
    }
}

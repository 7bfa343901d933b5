//! The remote document shape.

use crate::{CredentialHash, Version};
use serde::{Deserialize, Serialize};

/// The shared record stored remotely under one access code.
///
/// `S` is the opaque synchronized payload. The sync layer never inspects
/// its shape; it only requires clone and structural equality. The record
/// is always written wholesale, never field-merged, with one exception:
/// flipping `invalidated` is a merge-write performed by the store so a
/// revocation cannot race a concurrent state write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedRecord<S> {
    /// The synchronized payload.
    pub state: S,
    /// Logical version assigned when this record was accepted.
    pub version: Version,
    /// True once an administrator has revoked this access code.
    #[serde(default)]
    pub invalidated: bool,
    /// Hash of the administrator secret, set at session creation.
    #[serde(default = "Option::default")]
    pub credential_hash: Option<CredentialHash>,
}

impl<S> SharedRecord<S> {
    /// Creates a fresh record for a new session.
    pub fn new(state: S, version: Version, credential_hash: Option<CredentialHash>) -> Self {
        Self {
            state,
            version,
            invalidated: false,
            credential_hash,
        }
    }

}

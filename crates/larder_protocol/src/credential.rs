//! Administrator credential hash.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 hash of the administrator secret.
///
/// Set once at session creation and stored on the shared record.
/// Destructive operations (force-overwrite, session invalidation,
/// import-overwrite) require a secret whose hash matches. Verification
/// fails closed: a record with no stored hash rejects every secret
/// rather than behaving as "no password required".
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialHash([u8; 32]);

impl CredentialHash {
    /// Hashes a secret.
    pub fn from_secret(secret: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        CredentialHash(hasher.finalize().into())
    }

    /// Checks a secret against this hash.
    ///
    /// Hash equality suffices here; there is no timing-sensitive context.
    pub fn verify(&self, secret: &str) -> bool {
        Self::from_secret(secret) == *self
    }

    /// Returns the raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the full hash; the prefix is enough to correlate.
        write!(
            f,
            "CredentialHash({:02x}{:02x}{:02x}{:02x}..)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_secret_same_hash() {
        let a = CredentialHash::from_secret("hunter2");
        let b = CredentialHash::from_secret("hunter2");
        assert_eq!(a, b);
    }

    #[test]
    fn verify_accepts_matching_secret() {
        let hash = CredentialHash::from_secret("correct horse");
        assert!(hash.verify("correct horse"));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let hash = CredentialHash::from_secret("correct horse");
        assert!(!hash.verify("battery staple"));
        assert!(!hash.verify(""));
    }

    #[test]
    fn debug_does_not_leak_full_hash() {
        let hash = CredentialHash::from_secret("secret");
        let printed = format!("{hash:?}");
        assert!(printed.len() < 32);
    }
}

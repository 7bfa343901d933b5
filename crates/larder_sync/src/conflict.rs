//! Conflict context and replica status.

use larder_protocol::Version;

/// One side of a conflict.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictSide<S> {
    /// The state on this side.
    pub state: S,
    /// The version this side is at.
    pub version: Version,
}

/// A detected conflict between local edits and a newer remote record.
///
/// Created when a push is rejected or a pull discovers a newer remote
/// version while edits are pending. It exists so the human can decide;
/// the engine changes nothing until one of the resolution methods is
/// called. Resolved by exactly one of adopt-remote, force-local
/// (credential-gated) or cancel.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictContext<S> {
    /// The local side: live state and the version this device last
    /// observed.
    pub local: ConflictSide<S>,
    /// The remote side as read when the conflict was detected.
    pub remote: ConflictSide<S>,
}

/// Where the replica stands with respect to the remote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No pending edits; pulls fast-forward silently.
    Clean,
    /// Pending edits, no conflict observed yet.
    Dirty,
    /// A conflict awaits a human decision.
    ConflictPending,
}

impl SyncStatus {
    /// Returns true if a pull may silently adopt remote state.
    pub fn can_fast_forward(&self) -> bool {
        matches!(self, SyncStatus::Clean)
    }

    /// Returns true if an auto-push may fire.
    pub fn can_auto_push(&self) -> bool {
        matches!(self, SyncStatus::Dirty)
    }

    /// Returns true while a conflict awaits resolution.
    pub fn is_conflicted(&self) -> bool {
        matches!(self, SyncStatus::ConflictPending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_predicates() {
        assert!(SyncStatus::Clean.can_fast_forward());
        assert!(!SyncStatus::Dirty.can_fast_forward());
        assert!(!SyncStatus::ConflictPending.can_fast_forward());

        assert!(SyncStatus::Dirty.can_auto_push());
        assert!(!SyncStatus::ConflictPending.can_auto_push());

        assert!(SyncStatus::ConflictPending.is_conflicted());
    }

    #[test]
    fn context_carries_both_sides() {
        let ctx = ConflictContext {
            local: ConflictSide {
                state: "mine",
                version: Version::from_millis(10),
            },
            remote: ConflictSide {
                state: "theirs",
                version: Version::from_millis(11),
            },
        };
        assert!(ctx.remote.version > ctx.local.version);
    }
}

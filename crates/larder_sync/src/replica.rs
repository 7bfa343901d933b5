//! The per-device local replica.

use larder_protocol::Version;
use serde::{Deserialize, Serialize};

/// The local replica of the synchronized state.
///
/// Holds the live editable value, the highest remote version this device
/// has observed, and a snapshot of the state at the last confirmed sync.
/// Whether edits are pending is derived from the snapshot rather than
/// tracked as a flag, so it can never drift out of step with the state.
///
/// The three fields always change together: [`LocalReplica::mark_synced`]
/// is the only way a sync outcome lands, and the caller persists the
/// whole replica afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalReplica<S> {
    /// The live, editable value.
    pub state: S,
    /// Highest version observed from the remote record (zero = never
    /// synced).
    pub known_version: Version,
    /// State at the last confirmed successful sync.
    pub last_synced_snapshot: S,
}

impl<S: Clone + PartialEq> LocalReplica<S> {
    /// Creates a replica that has never synced.
    pub fn new(state: S) -> Self {
        let snapshot = state.clone();
        Self {
            state,
            known_version: Version::ZERO,
            last_synced_snapshot: snapshot,
        }
    }

    /// Returns true if the live state differs from the last-synced
    /// snapshot.
    pub fn pending_changes(&self) -> bool {
        self.state != self.last_synced_snapshot
    }

    /// Records a confirmed sync (push accepted or remote adopted):
    /// state, version and snapshot move together.
    pub fn mark_synced(&mut self, state: S, version: Version) {
        self.last_synced_snapshot = state.clone();
        self.state = state;
        self.known_version = version;
    }

    /// Reverts the live state to the last-synced snapshot.
    pub fn discard_edits(&mut self) {
        self.state = self.last_synced_snapshot.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_replica_is_clean() {
        let replica = LocalReplica::new(vec!["flour"]);
        assert!(!replica.pending_changes());
        assert!(replica.known_version.is_zero());
    }

    #[test]
    fn edit_makes_pending() {
        let mut replica = LocalReplica::new(vec!["flour"]);
        replica.state.push("sugar");
        assert!(replica.pending_changes());
    }

    #[test]
    fn edit_back_to_snapshot_is_clean_again() {
        let mut replica = LocalReplica::new(vec!["flour"]);
        replica.state.push("sugar");
        replica.state.pop();
        assert!(!replica.pending_changes());
    }

    #[test]
    fn mark_synced_updates_all_fields() {
        let mut replica = LocalReplica::new(vec!["flour"]);
        replica.state.push("sugar");

        replica.mark_synced(replica.state.clone(), Version::from_millis(11));
        assert!(!replica.pending_changes());
        assert_eq!(replica.known_version, Version::from_millis(11));
        assert_eq!(replica.last_synced_snapshot, vec!["flour", "sugar"]);
    }

    #[test]
    fn discard_reverts_to_snapshot() {
        let mut replica = LocalReplica::new(vec!["flour"]);
        replica.state.push("sugar");
        replica.discard_edits();
        assert!(!replica.pending_changes());
        assert_eq!(replica.state, vec!["flour"]);
    }
}

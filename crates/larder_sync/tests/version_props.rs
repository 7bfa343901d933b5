//! Property tests for version monotonicity and the lost-update guard.

use larder_protocol::{SharedRecord, Version};
use larder_store::{MemoryStore, SharedStore};
use larder_sync::{MemoryCache, SyncConfig, SyncEngine, SyncError};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Instant;

proptest! {
    #[test]
    fn next_after_strictly_increases(millis in 0..u64::MAX - 1) {
        let current = Version::from_millis(millis);
        prop_assert!(Version::next_after(current) > current);
    }

    #[test]
    fn chained_versions_stay_strictly_monotonic(
        seed in 0..u64::MAX / 2,
        steps in 1usize..64,
    ) {
        let mut version = Version::from_millis(seed);
        for _ in 0..steps {
            let next = Version::next_after(version);
            prop_assert!(next > version);
            version = next;
        }
    }
}

/// One step of a simulated session: local edits, pushes, foreign writes
/// landing directly in the store, and the two pull paths.
#[derive(Debug, Clone)]
enum Op {
    Edit(u8),
    Push,
    ForeignWrite(u8),
    Pull,
    ProcessEvents,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..20).prop_map(Op::Edit),
        Just(Op::Push),
        (1u8..50).prop_map(Op::ForeignWrite),
        Just(Op::Pull),
        Just(Op::ProcessEvents),
    ]
}

proptest! {
    /// Under any interleaving of edits, pushes and foreign writes:
    /// the observed version never regresses, and no pull path ever
    /// replaces the state of a dirty replica.
    #[test]
    fn dirty_state_survives_any_interleaving(
        ops in proptest::collection::vec(op_strategy(), 1..40),
    ) {
        let store = Arc::new(MemoryStore::new());
        let mut engine = SyncEngine::open(
            SyncConfig::new(),
            Arc::clone(&store),
            MemoryCache::new(),
            vec!["base".to_string()],
        )
        .unwrap();
        let code = engine.create_session("secret").unwrap();
        let mut counter = 0u64;

        for op in ops {
            let known_before = engine.known_version();
            let state_before = engine.state().clone();
            let dirty_before = engine.pending_changes();

            match &op {
                Op::Edit(n) => {
                    counter += 1;
                    engine
                        .note_edit(vec![format!("edit-{n}-{counter}")], Instant::now())
                        .unwrap();
                }
                Op::Push => match engine.push() {
                    Ok(_) | Err(SyncError::StaleWrite { .. }) => {}
                    Err(err) => return Err(TestCaseError::fail(err.to_string())),
                },
                Op::ForeignWrite(delta) => {
                    counter += 1;
                    let version =
                        Version::from_millis(known_before.as_millis() + u64::from(*delta));
                    store
                        .put(
                            &code,
                            SharedRecord::new(vec![format!("foreign-{counter}")], version, None),
                        )
                        .unwrap();
                }
                Op::Pull => {
                    engine.pull().unwrap();
                }
                Op::ProcessEvents => {
                    engine.process_events().unwrap();
                }
            }

            prop_assert!(engine.known_version() >= known_before);
            if dirty_before
                && matches!(op, Op::Pull | Op::ProcessEvents | Op::ForeignWrite(_))
            {
                prop_assert_eq!(engine.state(), &state_before);
            }
        }
    }
}

//! In-process shared store for tests and single-machine use.

use crate::error::{StoreError, StoreResult};
use crate::store::{RemoteEvent, SharedStore, Subscription};
use larder_protocol::{AccessCode, SharedRecord};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::time::Duration;

/// An in-memory [`SharedStore`].
///
/// Multiple engines sharing one `MemoryStore` (via `Arc`) behave like
/// multiple devices sharing one remote record, which is how the
/// multi-device scenarios are tested. Failure paths are injectable:
/// [`MemoryStore::set_offline`] makes every call fail with a retryable
/// transport error, [`MemoryStore::poison`] makes reads of one code
/// report a corrupt record, and [`MemoryStore::set_latency`] delays
/// every call for deadline tests.
pub struct MemoryStore<S> {
    records: RwLock<HashMap<AccessCode, SharedRecord<S>>>,
    listeners: RwLock<HashMap<AccessCode, Vec<Sender<RemoteEvent>>>>,
    poisoned: RwLock<HashSet<AccessCode>>,
    offline: AtomicBool,
    latency: RwLock<Duration>,
}

impl<S> MemoryStore<S> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            listeners: RwLock::new(HashMap::new()),
            poisoned: RwLock::new(HashSet::new()),
            offline: AtomicBool::new(false),
            latency: RwLock::new(Duration::ZERO),
        }
    }

    /// Simulates loss (or recovery) of connectivity.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delays every call by `latency`, for deadline tests.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// Makes reads of `code` report a corrupt record.
    pub fn poison(&self, code: &AccessCode) {
        self.poisoned.write().insert(code.clone());
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn check_online(&self) -> StoreResult<()> {
        let latency = *self.latency.read();
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::unavailable("store offline"))
        } else {
            Ok(())
        }
    }

    fn notify(&self, code: &AccessCode, event: RemoteEvent) {
        let mut listeners = self.listeners.write();
        if let Some(senders) = listeners.get_mut(code) {
            // Dropped subscriptions are pruned as they are discovered.
            senders.retain(|tx| tx.send(event).is_ok());
        }
    }
}

impl<S> Default for MemoryStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Send + Sync> SharedStore<S> for MemoryStore<S> {
    fn get(&self, code: &AccessCode) -> StoreResult<Option<SharedRecord<S>>> {
        self.check_online()?;
        if self.poisoned.read().contains(code) {
            return Err(StoreError::corrupt("record failed shape validation"));
        }
        Ok(self.records.read().get(code).cloned())
    }

    fn put(&self, code: &AccessCode, record: SharedRecord<S>) -> StoreResult<()> {
        self.check_online()?;
        let version = record.version;
        self.records.write().insert(code.clone(), record);
        self.notify(code, RemoteEvent::Changed(version));
        Ok(())
    }

    fn mark_invalidated(&self, code: &AccessCode) -> StoreResult<()> {
        self.check_online()?;
        if let Some(record) = self.records.write().get_mut(code) {
            record.invalidated = true;
        }
        self.notify(code, RemoteEvent::Invalidated);
        Ok(())
    }

    fn subscribe(&self, code: &AccessCode) -> StoreResult<Subscription> {
        self.check_online()?;
        let (tx, rx) = mpsc::channel();
        self.listeners.write().entry(code.clone()).or_default().push(tx);
        Ok(Subscription::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_protocol::Version;

    fn code(s: &str) -> AccessCode {
        s.parse().unwrap()
    }

    fn record(state: &str, version: u64) -> SharedRecord<String> {
        SharedRecord::new(state.to_string(), Version::from_millis(version), None)
    }

    #[test]
    fn get_missing_is_none() {
        let store = MemoryStore::<String>::new();
        assert!(store.get(&code("AAAAAA")).unwrap().is_none());
    }

    #[test]
    fn put_then_get() {
        let store = MemoryStore::new();
        store.put(&code("AAAAAA"), record("jam", 3)).unwrap();

        let got = store.get(&code("AAAAAA")).unwrap().unwrap();
        assert_eq!(got.state, "jam");
        assert_eq!(got.version, Version::from_millis(3));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn put_replaces_wholesale() {
        let store = MemoryStore::new();
        store.put(&code("AAAAAA"), record("jam", 3)).unwrap();
        store.put(&code("AAAAAA"), record("tea", 4)).unwrap();

        let got = store.get(&code("AAAAAA")).unwrap().unwrap();
        assert_eq!(got.state, "tea");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn mark_invalidated_preserves_state_and_version() {
        let store = MemoryStore::new();
        store.put(&code("AAAAAA"), record("jam", 3)).unwrap();
        store.mark_invalidated(&code("AAAAAA")).unwrap();

        let got = store.get(&code("AAAAAA")).unwrap().unwrap();
        assert!(got.invalidated);
        assert_eq!(got.state, "jam");
        assert_eq!(got.version, Version::from_millis(3));
    }

    #[test]
    fn subscription_sees_writes() {
        let store = MemoryStore::new();
        let sub = store.subscribe(&code("AAAAAA")).unwrap();

        store.put(&code("AAAAAA"), record("jam", 3)).unwrap();
        store.mark_invalidated(&code("AAAAAA")).unwrap();

        let events = sub.drain();
        assert_eq!(
            events,
            vec![
                RemoteEvent::Changed(Version::from_millis(3)),
                RemoteEvent::Invalidated
            ]
        );
    }

    #[test]
    fn subscription_is_per_code() {
        let store = MemoryStore::new();
        let sub = store.subscribe(&code("AAAAAA")).unwrap();

        store.put(&code("BBBBBB"), record("jam", 3)).unwrap();
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn dropped_subscription_is_pruned() {
        let store = MemoryStore::new();
        let sub = store.subscribe(&code("AAAAAA")).unwrap();
        drop(sub);

        // The next notify discards the dead sender without error.
        store.put(&code("AAAAAA"), record("jam", 3)).unwrap();
        assert!(store.listeners.read().get(&code("AAAAAA")).unwrap().is_empty());
    }

    #[test]
    fn offline_fails_every_call() {
        let store = MemoryStore::<String>::new();
        store.set_offline(true);

        assert!(store.get(&code("AAAAAA")).is_err());
        assert!(store.put(&code("AAAAAA"), record("jam", 1)).is_err());
        assert!(store.subscribe(&code("AAAAAA")).is_err());

        store.set_offline(false);
        assert!(store.get(&code("AAAAAA")).is_ok());
    }

    #[test]
    fn poisoned_record_reads_as_corrupt() {
        let store = MemoryStore::new();
        store.put(&code("AAAAAA"), record("jam", 3)).unwrap();
        store.poison(&code("AAAAAA"));

        let err = store.get(&code("AAAAAA")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert!(!err.is_retryable());
    }
}

//! The shared-store trait and live-update types.

use crate::error::StoreResult;
use larder_protocol::{AccessCode, SharedRecord, Version};
use std::sync::mpsc::{Receiver, TryRecvError};

/// A live-update notification for one access code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEvent {
    /// The record was written; carries the version of the write.
    Changed(Version),
    /// The access code was revoked by an administrator.
    Invalidated,
}

/// A handle to a live-update subscription.
///
/// Events are delivered over an internal channel; dropping the handle
/// unsubscribes. The engine drains events explicitly rather than being
/// called back, which keeps the single-threaded event model honest.
pub struct Subscription {
    receiver: Receiver<RemoteEvent>,
}

impl Subscription {
    /// Wraps a receiver into a subscription handle.
    pub fn new(receiver: Receiver<RemoteEvent>) -> Self {
        Self { receiver }
    }

    /// Drains all events delivered since the last call.
    pub fn drain(&self) -> Vec<RemoteEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}

/// Durable keyed storage shared between devices.
///
/// One record per access code, written wholesale. Implementations must
/// make `put` atomic: a reader never observes a partially written
/// record. The only field-level write is [`SharedStore::mark_invalidated`],
/// which flips the revocation flag without touching state or version so
/// a revocation cannot clobber a concurrent state write.
pub trait SharedStore<S>: Send + Sync {
    /// Reads the record for a code. `Ok(None)` if no record exists.
    fn get(&self, code: &AccessCode) -> StoreResult<Option<SharedRecord<S>>>;

    /// Replaces the record for a code (whole-record write).
    fn put(&self, code: &AccessCode, record: SharedRecord<S>) -> StoreResult<()>;

    /// Marks the record for a code as invalidated (merge-write).
    fn mark_invalidated(&self, code: &AccessCode) -> StoreResult<()>;

    /// Subscribes to live updates for a code.
    fn subscribe(&self, code: &AccessCode) -> StoreResult<Subscription>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn drain_empties_channel() {
        let (tx, rx) = mpsc::channel();
        let sub = Subscription::new(rx);

        tx.send(RemoteEvent::Changed(Version::from_millis(1))).unwrap();
        tx.send(RemoteEvent::Invalidated).unwrap();

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], RemoteEvent::Invalidated);
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn drain_survives_sender_drop() {
        let (tx, rx) = mpsc::channel();
        let sub = Subscription::new(rx);
        tx.send(RemoteEvent::Changed(Version::from_millis(7))).unwrap();
        drop(tx);

        assert_eq!(sub.drain().len(), 1);
        assert!(sub.drain().is_empty());
    }
}

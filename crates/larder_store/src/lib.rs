//! # Larder Store
//!
//! The remote shared-store seam for the larder sync engine.
//!
//! This crate provides:
//! - [`SharedStore`], the trait the engine syncs against
//! - [`RemoteEvent`] and [`Subscription`] for live updates
//! - [`MemoryStore`], an in-process reference implementation with
//!   failure injection for tests
//!
//! The store is deliberately dumb keyed storage: whole-record get/put
//! plus a single merge-write for invalidation. All compare-and-swap
//! logic lives in the engine, which reads the current version before
//! writing. The store's only job is durability and change notification.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::{RemoteEvent, SharedStore, Subscription};

//! # Larder Sync Engine
//!
//! Keeps a local replica of an opaque application state consistent with a
//! shared remote record under concurrent, intermittently connected
//! writers.
//!
//! This crate provides:
//! - [`SyncEngine`], the per-session orchestrator (pull, push, conflict
//!   resolution, invalidation)
//! - Version-guarded pushes: a write is accepted only if the writer has
//!   observed the current stored version (a lost-update guard, not a
//!   merge)
//! - Debounced auto-push of local edits
//! - Echo-suppressed live-update handling
//! - Credential-gated destructive operations
//! - Durable replica caching ([`MemoryCache`], [`FileCache`])
//! - File export/import of the synchronized state
//!
//! ## Model
//!
//! The engine is single-threaded and event-driven: the caller feeds it
//! user edits ([`SyncEngine::note_edit`]), clock ticks
//! ([`SyncEngine::tick`]) and remote events
//! ([`SyncEngine::process_events`]); every remote call completes before
//! the next event is handled, so pushes within one device are strictly
//! sequential. Concurrency is distributed: other devices write to the
//! same record, and the version check on the push path is the only
//! ordering the system enforces across them.
//!
//! ## Key invariants
//!
//! - Accepted versions are strictly increasing per record
//! - Local edits are never replaced without an explicit resolution
//!   (adopt-remote, force-local) or a clean fast-forward
//! - A device's own accepted write never raises a conflict on that device
//! - Verification against an absent credential hash fails closed

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod conflict;
mod debounce;
mod engine;
mod error;
mod gate;
mod replica;
mod transfer;

pub use cache::{CacheError, FileCache, MemoryCache, ReplicaCache};
pub use config::{RetryConfig, SyncConfig};
pub use conflict::{ConflictContext, ConflictSide, SyncStatus};
pub use debounce::EditDebounce;
pub use engine::{PullOutcome, PushOutcome, StateHost, SyncEngine, SyncStats};
pub use error::{SyncError, SyncResult};
pub use gate::ListenerGate;
pub use replica::LocalReplica;
pub use transfer::{export_envelope, import_envelope, TransferEnvelope, TransferError};

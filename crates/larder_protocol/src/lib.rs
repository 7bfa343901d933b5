//! # Larder Sync Protocol
//!
//! Shared types for the larder synchronization engine.
//!
//! This crate provides:
//! - [`Version`], the logical clock a writer assigns to each accepted write
//! - [`AccessCode`], the short human-copyable session key
//! - [`CredentialHash`], the administrator secret hash
//! - [`SharedRecord`], the remote document shape
//!
//! This is a pure types crate with no I/O. The synchronized state itself
//! is opaque: every type here is generic over (or independent of) the
//! payload, which only needs to be cloneable and equality-comparable.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod code;
mod credential;
mod record;
mod version;

pub use code::{AccessCode, AccessCodeError, CODE_LEN};
pub use credential::CredentialHash;
pub use record::SharedRecord;
pub use version::Version;

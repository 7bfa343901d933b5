//! Durable replica cache.
//!
//! The cache is private to one device and survives process restarts. It
//! always holds the whole replica (state, known version, last-synced
//! snapshot): partial saves are impossible by construction, and the
//! file-backed implementation writes through a temporary file so a crash
//! mid-save never leaves a torn cache behind.

use crate::replica::LocalReplica;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error from the replica cache.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CacheError {
    message: String,
}

impl CacheError {
    /// Creates a cache error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::new(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::new(err.to_string())
    }
}

/// Persistence seam for the local replica.
pub trait ReplicaCache<S> {
    /// Loads the cached replica, if one was saved.
    fn load(&self) -> Result<Option<LocalReplica<S>>, CacheError>;

    /// Saves the replica.
    fn save(&self, replica: &LocalReplica<S>) -> Result<(), CacheError>;
}

/// An in-memory cache for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryCache<S> {
    slot: parking_lot::Mutex<Option<LocalReplica<S>>>,
}

impl<S> MemoryCache<S> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            slot: parking_lot::Mutex::new(None),
        }
    }
}

impl<S: Clone> ReplicaCache<S> for MemoryCache<S> {
    fn load(&self) -> Result<Option<LocalReplica<S>>, CacheError> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, replica: &LocalReplica<S>) -> Result<(), CacheError> {
        *self.slot.lock() = Some(replica.clone());
        Ok(())
    }
}

/// A JSON file cache.
///
/// Saves write to `<path>.tmp` and rename into place, so the cache file
/// is always either the previous replica or the new one, never a mix.
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    /// Creates a cache backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

impl<S: Serialize + DeserializeOwned> ReplicaCache<S> for FileCache {
    fn load(&self) -> Result<Option<LocalReplica<S>>, CacheError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let replica = serde_json::from_slice(&bytes)?;
        Ok(Some(replica))
    }

    fn save(&self, replica: &LocalReplica<S>) -> Result<(), CacheError> {
        let json = serde_json::to_vec(replica)?;
        let tmp = self.tmp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

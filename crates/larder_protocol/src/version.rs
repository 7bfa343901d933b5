//! Logical version assigned to each accepted write.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A logical clock value attached to a shared record at write time.
///
/// Versions are wall-clock milliseconds in the common case, but the
/// accept path of a write always computes the new version with
/// [`Version::next_after`], which guarantees strict growth even when the
/// local clock is behind the stored version (clock skew between devices).
///
/// A value of zero ([`Version::ZERO`]) means "never synced".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// The never-synced version.
    pub const ZERO: Version = Version(0);

    /// Creates a version from a raw millisecond value.
    pub const fn from_millis(millis: u64) -> Self {
        Version(millis)
    }

    /// Returns the raw millisecond value.
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Returns true if this replica has never observed a synced version.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Computes the version for a write accepted after `current`.
    ///
    /// Takes the wall clock reading but never goes backwards: the result
    /// is strictly greater than `current`, saturating at the top of the
    /// range.
    pub fn next_after(current: Version) -> Version {
        Version(now_millis().max(current.0.saturating_add(1)))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

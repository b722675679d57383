//! Snapshot - Totally ordered version number
//!
//! - Totally orders all commits of one store instance
//! - Purely logical, independent of wall-clock time
//! - Advanced exactly once per committing write transaction
//!
//! This is a PURE TYPE with NO behavior beyond construction, access and
//! successor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A point-in-time version number.
///
/// A statement is visible to a reader holding snapshot `S` iff
/// `since <= S < till`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(u64);

impl Snapshot {
    /// The snapshot of an empty, never-committed store.
    pub const INITIAL: Snapshot = Snapshot(0);

    /// "Not yet removed". Used as the retirement marker of live statements;
    /// never handed out as a reader snapshot.
    pub const UNBOUNDED: Snapshot = Snapshot(u64::MAX);

    /// Creates a snapshot with the given value.
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The snapshot a committing writer will publish.
    #[inline]
    pub fn next(&self) -> Snapshot {
        debug_assert!(self.0 < u64::MAX - 1, "snapshot counter exhausted");
        Snapshot(self.0 + 1)
    }

    #[inline]
    pub fn is_unbounded(&self) -> bool {
        self.0 == u64::MAX
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            write!(f, "∞")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

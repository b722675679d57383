//! ReadView - Stable snapshot boundary
//!
//! A read view describes which statement versions one read may observe:
//! - `snapshot`: every version committed at or before it
//! - `own_writes`: the pending snapshot of the reading transaction, if it
//!   holds writer rights, so it sees its own uncommitted adds and removes
//!
//! This is a PURE TYPE with NO behavior beyond construction and access.

use super::Snapshot;

/// A stable snapshot boundary for read operations.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ReadView {
    snapshot: Snapshot,
    own_writes: Option<Snapshot>,
}

impl ReadView {
    /// A view of everything committed at or before `snapshot`.
    #[inline]
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            own_writes: None,
        }
    }

    /// A view that additionally observes the pending writes stamped with
    /// `pending`.
    #[inline]
    pub fn with_own_writes(snapshot: Snapshot, pending: Snapshot) -> Self {
        Self {
            snapshot,
            own_writes: Some(pending),
        }
    }

    #[inline]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
    }

    #[inline]
    pub fn own_writes(&self) -> Option<Snapshot> {
        self.own_writes
    }
}

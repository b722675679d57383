//! Snapshot Counter - commit identity assignment
//!
//! - Snapshots are assigned exactly once, by the committing writer
//! - The ordering is total and strict
//! - Only the holder of the writer gate advances the counter
//!
//! Readers load the counter without locking. Publishing `current + 1` is a
//! single release store, which is what makes a commit atomic: every pending
//! version of the writer is stamped with that value beforehand.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::mvcc::Snapshot;
use crate::store::{StoreError, StoreResult};

/// The store's commit counter.
#[derive(Debug, Default)]
pub struct SnapshotCounter {
    current: AtomicU64,
}

impl SnapshotCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest committed snapshot.
    #[inline]
    pub fn current(&self) -> Snapshot {
        Snapshot::new(self.current.load(Ordering::Acquire))
    }

    /// The snapshot the next commit will publish.
    #[inline]
    pub fn next(&self) -> Snapshot {
        self.current().next()
    }

    /// Publish `snapshot` as committed.
    ///
    /// Must be called by the writer-gate holder with exactly
    /// `current + 1`; anything else is a store fault.
    pub fn mark_committed(&self, snapshot: Snapshot) -> StoreResult<()> {
        let expected = self.current.load(Ordering::Acquire) + 1;
        if snapshot.value() != expected {
            return Err(StoreError::fault(format!(
                "out of order commit: attempted {} but expected {}",
                snapshot, expected
            )));
        }
        self.current
            .compare_exchange(
                expected - 1,
                expected,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|actual| {
                StoreError::fault(format!(
                    "snapshot counter advanced concurrently to {}",
                    actual
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_counter_starts_at_zero() {
        let counter = SnapshotCounter::new();
        assert_eq!(counter.current(), Snapshot::INITIAL);
        assert_eq!(counter.next(), Snapshot::new(1));
    }

    #[test]
    fn test_mark_committed_advances() {
        let counter = SnapshotCounter::new();
        counter.mark_committed(counter.next()).unwrap();
        counter.mark_committed(counter.next()).unwrap();
        assert_eq!(counter.current(), Snapshot::new(2));
    }

    #[test]
    fn test_out_of_order_commit_is_fault() {
        let counter = SnapshotCounter::new();
        let err = counter.mark_committed(Snapshot::new(5)).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(counter.current(), Snapshot::INITIAL);
    }

    #[test]
    fn test_repeated_commit_is_fault() {
        let counter = SnapshotCounter::new();
        counter.mark_committed(Snapshot::new(1)).unwrap();
        assert!(counter.mark_committed(Snapshot::new(1)).is_err());
    }
}

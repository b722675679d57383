//! Snapshot reservations
//!
//! The clean floor is defined by:
//! - the oldest reserved snapshot, held by an open transaction or cursor
//! - the current snapshot, if nothing older is reserved
//!
//! A statement with `till <= floor` is invisible to every reader that can
//! still exist and may be purged.
//!
//! Reservations are RAII handles. Reserving the current snapshot and
//! computing the floor both happen under the monitor lock, so a cleaner can
//! never compute a floor above a snapshot that is about to be reserved.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::Snapshot;

/// Tracks reserved snapshots and computes the clean floor.
#[derive(Debug, Default)]
pub struct SnapshotMonitor {
    reservations: Mutex<BTreeMap<u64, usize>>,
}

impl SnapshotMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the snapshot returned by `current`, evaluated under the lock.
    pub fn reserve_with(
        self: &Arc<Self>,
        current: impl FnOnce() -> Snapshot,
    ) -> SnapshotReservation {
        let mut reservations = self.reservations.lock();
        let snapshot = current();
        *reservations.entry(snapshot.value()).or_insert(0) += 1;
        SnapshotReservation {
            monitor: Arc::clone(self),
            snapshot,
            released: false,
        }
    }

    /// Reserve a snapshot that is already protected by another reservation
    /// (a cursor opened inside a transaction).
    pub fn reserve(self: &Arc<Self>, snapshot: Snapshot) -> SnapshotReservation {
        self.reserve_with(|| snapshot)
    }

    /// The clean floor given the current snapshot.
    pub fn floor_with(&self, current: impl FnOnce() -> Snapshot) -> Snapshot {
        let reservations = self.reservations.lock();
        let current = current();
        match reservations.keys().next() {
            Some(&oldest) => Snapshot::new(oldest).min(current),
            None => current,
        }
    }

    pub fn oldest_reserved(&self) -> Option<Snapshot> {
        self.reservations
            .lock()
            .keys()
            .next()
            .map(|&v| Snapshot::new(v))
    }

    /// Total number of outstanding reservations.
    pub fn active_count(&self) -> usize {
        self.reservations.lock().values().sum()
    }

    fn release(&self, snapshot: Snapshot) {
        let mut reservations = self.reservations.lock();
        if let Some(count) = reservations.get_mut(&snapshot.value()) {
            *count -= 1;
            if *count == 0 {
                reservations.remove(&snapshot.value());
            }
        }
    }
}

/// A held snapshot. Released on drop.
#[derive(Debug)]
pub struct SnapshotReservation {
    monitor: Arc<SnapshotMonitor>,
    snapshot: Snapshot,
    released: bool,
}

impl SnapshotReservation {
    #[inline]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
    }

    /// Release early. Idempotent.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.monitor.release(self.snapshot);
        }
    }
}

impl Drop for SnapshotReservation {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_floor_is_current_without_reservations() {
        let monitor = Arc::new(SnapshotMonitor::new());
        assert_eq!(monitor.floor_with(|| Snapshot::new(9)), Snapshot::new(9));
        assert_eq!(monitor.oldest_reserved(), None);
    }

    #[test]
    fn test_floor_is_oldest_reservation() {
        let monitor = Arc::new(SnapshotMonitor::new());
        let _a = monitor.reserve(Snapshot::new(5));
        let _b = monitor.reserve(Snapshot::new(7));
        assert_eq!(monitor.floor_with(|| Snapshot::new(9)), Snapshot::new(5));
        assert_eq!(monitor.active_count(), 2);
    }

    #[test]
    fn test_drop_releases() {
        let monitor = Arc::new(SnapshotMonitor::new());
        {
            let _a = monitor.reserve(Snapshot::new(3));
            assert_eq!(monitor.oldest_reserved(), Some(Snapshot::new(3)));
        }
        assert_eq!(monitor.oldest_reserved(), None);
        assert_eq!(monitor.active_count(), 0);
    }

    #[test]
    fn test_shared_snapshot_counted() {
        let monitor = Arc::new(SnapshotMonitor::new());
        let a = monitor.reserve(Snapshot::new(4));
        let mut b = monitor.reserve(Snapshot::new(4));
        assert_eq!(monitor.active_count(), 2);

        b.release();
        b.release();
        assert_eq!(monitor.oldest_reserved(), Some(Snapshot::new(4)));
        drop(a);
        assert_eq!(monitor.oldest_reserved(), None);
    }

    #[test]
    fn test_reserve_with_reads_counter_under_lock() {
        let monitor = Arc::new(SnapshotMonitor::new());
        let counter = AtomicU64::new(12);
        let r = monitor.reserve_with(|| Snapshot::new(counter.load(Ordering::Acquire)));
        assert_eq!(r.snapshot(), Snapshot::new(12));
        counter.store(20, Ordering::Release);
        assert_eq!(
            monitor.floor_with(|| Snapshot::new(counter.load(Ordering::Acquire))),
            Snapshot::new(12)
        );
    }
}

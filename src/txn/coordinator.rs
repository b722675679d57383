//! Snapshot coordinator
//!
//! Owned by one store instance. Combines the commit counter, the writer
//! gate and the snapshot monitor, and hands out transaction ids.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{SnapshotCounter, WriterGate};
use crate::mvcc::{Snapshot, SnapshotMonitor, SnapshotReservation};
use crate::store::StoreResult;

#[derive(Debug)]
pub struct SnapshotCoordinator {
    counter: SnapshotCounter,
    gate: WriterGate,
    monitor: Arc<SnapshotMonitor>,
    next_tx_id: AtomicU64,
    lock_timeout: Duration,
}

impl SnapshotCoordinator {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            counter: SnapshotCounter::new(),
            gate: WriterGate::new(),
            monitor: Arc::new(SnapshotMonitor::new()),
            next_tx_id: AtomicU64::new(1),
            lock_timeout,
        }
    }

    pub fn allocate_tx_id(&self) -> u64 {
        self.next_tx_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Latest committed snapshot.
    pub fn current(&self) -> Snapshot {
        self.counter.current()
    }

    /// Reserve the latest committed snapshot.
    pub fn reserve_current(&self) -> SnapshotReservation {
        self.monitor.reserve_with(|| self.counter.current())
    }

    /// Add a reservation for a snapshot that is already reserved.
    pub fn reserve(&self, snapshot: Snapshot) -> SnapshotReservation {
        self.monitor.reserve(snapshot)
    }

    /// Highest snapshot `s` such that no live reader can see a version
    /// with `till <= s`.
    pub fn clean_floor(&self) -> Snapshot {
        self.monitor.floor_with(|| self.counter.current())
    }

    /// Acquire write rights for `tx_id`. Returns the pending snapshot its
    /// writes are stamped with.
    pub fn acquire_writer(&self, tx_id: u64, cancel: &AtomicBool) -> StoreResult<Snapshot> {
        self.gate.acquire(tx_id, self.lock_timeout, cancel)?;
        Ok(self.counter.next())
    }

    /// Publish the writer's pending snapshot.
    pub fn publish(&self, pending: Snapshot) -> StoreResult<()> {
        self.counter.mark_committed(pending)
    }

    pub fn release_writer(&self, tx_id: u64) -> bool {
        self.gate.release(tx_id)
    }

    /// Transaction currently holding write rights.
    pub fn writer(&self) -> Option<u64> {
        self.gate.holder()
    }

    pub fn monitor(&self) -> &Arc<SnapshotMonitor> {
        &self.monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> SnapshotCoordinator {
        SnapshotCoordinator::new(Duration::from_millis(50))
    }

    #[test]
    fn test_tx_ids_are_unique() {
        let c = coordinator();
        let a = c.allocate_tx_id();
        let b = c.allocate_tx_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_writer_cycle() {
        let c = coordinator();
        let cancel = AtomicBool::new(false);
        let pending = c.acquire_writer(7, &cancel).unwrap();
        assert_eq!(pending, Snapshot::new(1));
        assert_eq!(c.writer(), Some(7));

        c.publish(pending).unwrap();
        assert!(c.release_writer(7));
        assert_eq!(c.current(), Snapshot::new(1));
        assert_eq!(c.writer(), None);
    }

    #[test]
    fn test_second_writer_times_out() {
        let c = coordinator();
        let cancel = AtomicBool::new(false);
        c.acquire_writer(1, &cancel).unwrap();
        assert!(c.acquire_writer(2, &cancel).is_err());
    }

    #[test]
    fn test_clean_floor_follows_reservations() {
        let c = coordinator();
        let cancel = AtomicBool::new(false);
        let held = c.reserve_current();
        for _ in 0..3 {
            let pending = c.acquire_writer(1, &cancel).unwrap();
            c.publish(pending).unwrap();
            c.release_writer(1);
        }
        assert_eq!(c.clean_floor(), Snapshot::INITIAL);
        drop(held);
        assert_eq!(c.clean_floor(), Snapshot::new(3));
    }
}

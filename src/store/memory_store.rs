//! In-memory MVCC statement store
//!
//! `MemoryStore` owns every shared structure of one store instance:
//! interner, statement arena, pattern indexes, snapshot coordinator,
//! namespaces and metrics. They live in a `StoreInner` shared by the store,
//! its transactions and cursors, and weakly by the background cleaner.
//!
//! # Clean pass
//!
//! 1. Compute the floor: oldest reserved snapshot, else the current one
//! 2. Purge every version with `till <= floor` from the arena
//! 3. Drop the purged versions from the indexes in batches
//! 4. Sweep interner entries no statement references any more
//!
//! A pass never takes the writer gate and never blocks readers for longer
//! than one slot or one index batch.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use super::cleaner::{CleanupSignal, SnapshotCleaner};
use super::errors::{StoreError, StoreResult};
use super::namespaces::NamespaceStore;
use super::transaction::Transaction;
use crate::collection::StatementList;
use crate::config::StoreConfig;
use crate::index::{IdPattern, PatternIndexes};
use crate::interner::ValueInterner;
use crate::mvcc::{Snapshot, VersionedStatement};
use crate::observability::{
    log_event_with_fields, Event, Logger, MetricsRegistry, MetricsSnapshot, ObservationScope,
};
use crate::txn::{IsolationLevel, SnapshotCoordinator};

/// Purged versions dropped from the indexes per write-lock acquisition.
const INDEX_PURGE_BATCH: usize = 256;

/// Outcome of one clean pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    /// Versions with `till <= floor` were purged.
    pub floor: Snapshot,
    pub purged: usize,
    pub index_entries_removed: usize,
    pub terms_reclaimed: usize,
}

/// Point-in-time statistics of a store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub store_id: String,
    pub current_snapshot: Snapshot,
    pub occupied_slots: usize,
    pub live_statements: usize,
    pub slot_capacity: usize,
    pub index_entries: usize,
    pub interned_terms: usize,
    pub active_reservations: usize,
    pub oldest_reservation: Option<Snapshot>,
    pub writer: Option<u64>,
    pub metrics: MetricsSnapshot,
}

/// State shared by a store and everything it hands out.
#[derive(Debug)]
pub(crate) struct StoreInner {
    pub(crate) id: Uuid,
    pub(crate) config: StoreConfig,
    pub(crate) interner: ValueInterner,
    pub(crate) statements: StatementList,
    pub(crate) indexes: PatternIndexes,
    pub(crate) coordinator: SnapshotCoordinator,
    pub(crate) namespaces: NamespaceStore,
    pub(crate) metrics: MetricsRegistry,
    cleanup: Arc<CleanupSignal>,
    next_seq: AtomicU64,
    has_inferred: AtomicBool,
    closed: AtomicBool,
    clean_lock: Mutex<()>,
}

impl StoreInner {
    fn new(config: StoreConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            interner: ValueInterner::new(config.interner_sweep_interval),
            statements: StatementList::new(config.initial_capacity, config.max_statements),
            indexes: PatternIndexes::new(),
            coordinator: SnapshotCoordinator::new(config.lock_timeout()),
            namespaces: NamespaceStore::default(),
            metrics: MetricsRegistry::new(),
            cleanup: Arc::new(CleanupSignal::default()),
            next_seq: AtomicU64::new(1),
            has_inferred: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            clean_lock: Mutex::new(()),
            config,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn note_inferred(&self) {
        self.has_inferred.store(true, Ordering::Release);
    }

    /// False until the first inferred statement is added.
    pub(crate) fn may_have_inferred(&self) -> bool {
        self.has_inferred.load(Ordering::Acquire)
    }

    /// Call `visit` on every unpurged version matching `pattern`, in index
    /// order, until it returns false. Versions are not filtered by
    /// visibility.
    pub(crate) fn visit_versions<F>(&self, pattern: &IdPattern, mut visit: F)
    where
        F: FnMut(&Arc<VersionedStatement>) -> bool,
    {
        let mut after = None;
        loop {
            let batch = self
                .indexes
                .scan_batch(pattern, after.as_ref(), self.config.iterator_batch_size);
            for statement in &batch.statements {
                if !statement.is_purged() && !visit(statement) {
                    return;
                }
            }
            match batch.resume {
                Some(key) => after = Some(key),
                None => return,
            }
        }
    }

    /// Schedule a background pass if the arena is large enough to be worth
    /// it.
    pub(crate) fn request_cleanup(&self) {
        if !self.config.background_cleanup {
            return;
        }
        let occupied = self.statements.occupied();
        if occupied < self.config.cleanup_threshold {
            return;
        }
        if self.cleanup.request() {
            log_event_with_fields(
                Event::CleanScheduled,
                &[("occupied", &occupied.to_string())],
            );
        }
    }

    pub(crate) fn clean_to_floor(&self) -> StoreResult<CleanReport> {
        self.clean_below(self.coordinator.clean_floor())
    }

    /// Purge every version with `till <= min(limit, floor)`.
    pub(crate) fn clean_below(&self, limit: Snapshot) -> StoreResult<CleanReport> {
        let _serial = self.clean_lock.lock();
        let floor = self.coordinator.clean_floor().min(limit);
        let current = self.coordinator.current();
        if floor > current {
            return Err(StoreError::fault(format!(
                "clean floor {} above current snapshot {}",
                floor, current
            )));
        }

        let scope = ObservationScope::new("CLEAN");
        let mut batch: Vec<Arc<VersionedStatement>> = Vec::with_capacity(INDEX_PURGE_BATCH);
        let mut index_entries_removed = 0;
        let purged = self.statements.clean_snapshots(floor, |statement| {
            batch.push(statement);
            if batch.len() >= INDEX_PURGE_BATCH {
                index_entries_removed += self.indexes.remove_batch(&batch);
                batch.clear();
            }
        });
        index_entries_removed += self.indexes.remove_batch(&batch);
        drop(batch);

        if index_entries_removed != purged {
            scope.fail("index entries out of step with arena");
            return Err(StoreError::fault(format!(
                "purged {} versions but removed {} index entries",
                purged, index_entries_removed
            )));
        }

        let terms_reclaimed = self.interner.sweep();
        self.metrics.add_statements_purged(purged as u64);
        self.metrics.increment_clean_passes();
        self.metrics.record_interner_sweep(terms_reclaimed as u64);
        log_event_with_fields(
            Event::InternerSweep,
            &[("reclaimed", &terms_reclaimed.to_string())],
        );

        scope.complete_with_fields(&[
            ("floor", &floor.to_string()),
            ("purged", &purged.to_string()),
            ("terms_reclaimed", &terms_reclaimed.to_string()),
        ]);

        Ok(CleanReport {
            floor,
            purged,
            index_entries_removed,
            terms_reclaimed,
        })
    }

    fn stats(&self) -> StoreStats {
        let monitor = self.coordinator.monitor();
        StoreStats {
            store_id: self.id.to_string(),
            current_snapshot: self.coordinator.current(),
            occupied_slots: self.statements.occupied(),
            live_statements: self.statements.len(),
            slot_capacity: self.statements.capacity(),
            index_entries: self.indexes.len(),
            interned_terms: self.interner.live_count(),
            active_reservations: monitor.active_count(),
            oldest_reservation: monitor.oldest_reserved(),
            writer: self.coordinator.writer(),
            metrics: self.metrics.snapshot(),
        }
    }
}

/// An in-memory, multi-version RDF quad store.
///
/// ```ignore
/// let store = MemoryStore::with_defaults();
/// let mut tx = store.begin()?;
/// tx.add(&Term::iri("http://ex/s"), &Term::iri("http://ex/p"), &Term::literal("o"), None)?;
/// tx.commit()?;
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
    cleaner: Mutex<Option<SnapshotCleaner>>,
}

impl MemoryStore {
    /// Validate `config` and open an empty store.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self::open(config))
    }

    /// Open an empty store with the default configuration.
    pub fn with_defaults() -> Self {
        Self::open(StoreConfig::default())
    }

    fn open(config: StoreConfig) -> Self {
        Logger::set_min_severity(config.log_level);
        let inner = Arc::new(StoreInner::new(config));

        let cleaner = if inner.config.background_cleanup {
            match SnapshotCleaner::start(
                Arc::downgrade(&inner),
                Arc::clone(&inner.cleanup),
                inner.config.cleanup_delay(),
            ) {
                Ok(cleaner) => Some(cleaner),
                Err(e) => {
                    Logger::warn(
                        Event::CleanerStart.as_str(),
                        &[("error", &e.to_string()), ("fallback", "manual cleanup only")],
                    );
                    None
                }
            }
        } else {
            None
        };

        log_event_with_fields(
            Event::StoreOpen,
            &[
                ("background_cleanup", &cleaner.is_some().to_string()),
                ("initial_capacity", &inner.config.initial_capacity.to_string()),
                ("store_id", &inner.id.to_string()),
            ],
        );

        Self {
            inner,
            cleaner: Mutex::new(cleaner),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Start a transaction at the given isolation level.
    pub fn open_transaction(&self, isolation: IsolationLevel) -> StoreResult<Transaction> {
        self.ensure_open()?;
        Ok(Transaction::begin(Arc::clone(&self.inner), isolation))
    }

    /// Start a transaction at the configured default isolation level.
    pub fn begin(&self) -> StoreResult<Transaction> {
        self.open_transaction(self.inner.config.default_isolation)
    }

    /// Latest committed snapshot.
    pub fn current_snapshot(&self) -> Snapshot {
        self.inner.coordinator.current()
    }

    /// Run a clean pass now, at the current floor.
    pub fn clean_snapshots(&self) -> StoreResult<CleanReport> {
        self.ensure_open()?;
        self.inner.clean_to_floor()
    }

    /// Run a clean pass purging versions with `till <= limit`. The limit
    /// is lowered to the current floor if any reader still needs older
    /// versions.
    pub fn clean_snapshots_below(&self, limit: Snapshot) -> StoreResult<CleanReport> {
        self.ensure_open()?;
        self.inner.clean_below(limit)
    }

    /// The canonicalizing term registry of this store.
    pub fn interner(&self) -> &ValueInterner {
        &self.inner.interner
    }

    pub fn stats(&self) -> StoreStats {
        self.inner.stats()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Stop the background cleaner and reject further operations.
    /// Idempotent.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(mut cleaner) = self.cleaner.lock().take() {
            cleaner.stop();
        }
        log_event_with_fields(Event::StoreClose, &[("store_id", &self.inner.id.to_string())]);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.inner.is_closed() {
            return Err(StoreError::StoreClosed(format!("store {}", self.inner.id)));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::QuadPattern;
    use crate::model::Term;
    use std::time::{Duration, Instant};

    fn iri(s: &str) -> Term {
        Term::iri(format!("http://ex/{}", s))
    }

    fn manual() -> MemoryStore {
        MemoryStore::new(StoreConfig {
            background_cleanup: false,
            ..StoreConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let err = MemoryStore::new(StoreConfig {
            initial_capacity: 0,
            ..StoreConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn test_clean_respects_reservation() {
        let store = manual();
        let mut tx = store.begin().unwrap();
        tx.add(&iri("s"), &iri("p"), &iri("o"), None).unwrap();
        tx.commit().unwrap();

        let mut reader = store.begin().unwrap();
        let mut tx = store.begin().unwrap();
        tx.remove(&QuadPattern::any()).unwrap();
        tx.commit().unwrap();

        assert_eq!(store.clean_snapshots().unwrap().purged, 0);
        assert_eq!(reader.get_statements(&QuadPattern::any()).unwrap().count(), 1);
        drop(reader);

        let report = store.clean_snapshots().unwrap();
        assert_eq!(report.purged, 1);
        assert_eq!(report.floor, Snapshot::new(2));
        let stats = store.stats();
        assert_eq!(stats.occupied_slots, 0);
        assert_eq!(stats.index_entries, 0);
    }

    #[test]
    fn test_clean_sweeps_interner() {
        let store = manual();
        let mut tx = store.begin().unwrap();
        tx.add(&iri("gone"), &iri("p"), &iri("o"), None).unwrap();
        tx.commit().unwrap();
        let mut tx = store.begin().unwrap();
        tx.remove(&QuadPattern::any()).unwrap();
        tx.commit().unwrap();

        assert!(store.interner().contains(&iri("gone")));
        let report = store.clean_snapshots().unwrap();
        assert_eq!(report.terms_reclaimed, 3);
        assert!(!store.interner().contains(&iri("gone")));
    }

    #[test]
    fn test_closed_store_rejects_operations() {
        let store = manual();
        let mut tx = store.begin().unwrap();
        store.close();
        assert!(store.is_closed());
        assert!(matches!(store.begin().unwrap_err(), StoreError::StoreClosed(_)));
        let err = tx.add(&iri("s"), &iri("p"), &iri("o"), None).unwrap_err();
        assert_eq!(err.code(), "AERO_STORE_CLOSED");
        store.close();
    }

    #[test]
    fn test_background_cleaner_purges() {
        let store = MemoryStore::new(StoreConfig {
            cleanup_threshold: 1,
            cleanup_delay_ms: 0,
            ..StoreConfig::default()
        })
        .unwrap();
        let mut tx = store.begin().unwrap();
        tx.add(&iri("s"), &iri("p"), &iri("o"), None).unwrap();
        tx.commit().unwrap();
        let mut tx = store.begin().unwrap();
        tx.remove(&QuadPattern::any()).unwrap();
        tx.commit().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while store.stats().occupied_slots > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(store.stats().occupied_slots, 0);
        assert!(store.metrics().clean_passes >= 1);
    }

    #[test]
    fn test_stats_serialize() {
        let store = manual();
        let json = serde_json::to_value(store.stats()).unwrap();
        assert_eq!(json["current_snapshot"], 0);
        assert_eq!(json["live_statements"], 0);
        assert!(json["metrics"].is_object());
    }
}

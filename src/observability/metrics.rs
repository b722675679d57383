//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase, reset only on store construction
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters of one store instance.
///
/// All counters use Relaxed ordering. Values are exact once the
/// incrementing threads have been joined.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    statements_added: AtomicU64,
    statements_removed: AtomicU64,
    statements_purged: AtomicU64,
    statements_rolled_back: AtomicU64,
    transactions_begun: AtomicU64,
    transactions_committed: AtomicU64,
    transactions_rolled_back: AtomicU64,
    transactions_conflicted: AtomicU64,
    operations_interrupted: AtomicU64,
    clean_passes: AtomicU64,
    interner_sweeps: AtomicU64,
    terms_reclaimed: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Statements

    pub fn increment_statements_added(&self) {
        self.statements_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_statements_removed(&self, count: u64) {
        self.statements_removed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_statements_purged(&self, count: u64) {
        self.statements_purged.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_statements_rolled_back(&self, count: u64) {
        self.statements_rolled_back.fetch_add(count, Ordering::Relaxed);
    }

    // Transactions

    pub fn increment_transactions_begun(&self) {
        self.transactions_begun.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transactions_committed(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transactions_rolled_back(&self) {
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transactions_conflicted(&self) {
        self.transactions_conflicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_operations_interrupted(&self) {
        self.operations_interrupted.fetch_add(1, Ordering::Relaxed);
    }

    // Cleanup

    pub fn increment_clean_passes(&self) {
        self.clean_passes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one interner sweep and the number of entries it removed.
    pub fn record_interner_sweep(&self, reclaimed: u64) {
        self.interner_sweeps.fetch_add(1, Ordering::Relaxed);
        self.terms_reclaimed.fetch_add(reclaimed, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            statements_added: self.statements_added.load(Ordering::Relaxed),
            statements_removed: self.statements_removed.load(Ordering::Relaxed),
            statements_purged: self.statements_purged.load(Ordering::Relaxed),
            statements_rolled_back: self.statements_rolled_back.load(Ordering::Relaxed),
            transactions_begun: self.transactions_begun.load(Ordering::Relaxed),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_rolled_back: self.transactions_rolled_back.load(Ordering::Relaxed),
            transactions_conflicted: self.transactions_conflicted.load(Ordering::Relaxed),
            operations_interrupted: self.operations_interrupted.load(Ordering::Relaxed),
            clean_passes: self.clean_passes.load(Ordering::Relaxed),
            interner_sweeps: self.interner_sweeps.load(Ordering::Relaxed),
            terms_reclaimed: self.terms_reclaimed.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub statements_added: u64,
    pub statements_removed: u64,
    pub statements_purged: u64,
    pub statements_rolled_back: u64,
    pub transactions_begun: u64,
    pub transactions_committed: u64,
    pub transactions_rolled_back: u64,
    pub transactions_conflicted: u64,
    pub operations_interrupted: u64,
    pub clean_passes: u64,
    pub interner_sweeps: u64,
    pub terms_reclaimed: u64,
}

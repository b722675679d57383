//! Transactions
//!
//! A `Transaction` is the only way to read or write a store. Reads never
//! block. The first write acquires the store's writer gate and fixes the
//! pending snapshot every write of this transaction is stamped with:
//! - an add creates a version with `since = pending`
//! - a remove sets `till = pending` on a visible version
//! - commit publishes `pending` with one atomic store to the counter
//! - rollback purges pending adds and restores pending removes
//!
//! Removing a version this transaction added itself purges it at once, so
//! every stored version keeps `since < till`.
//!
//! Dropping an unfinished transaction rolls it back.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::cursor::StatementCursor;
use super::errors::{StoreError, StoreResult};
use super::memory_store::StoreInner;
use super::namespaces::{apply_changes, NamespaceChange};
use crate::collection::StatementHandle;
use crate::index::{ContextFilter, IdPattern, QuadPattern};
use crate::interner::TermId;
use crate::model::{Quad, Term};
use crate::mvcc::{ReadView, Snapshot, SnapshotReservation, VersionedStatement};
use crate::observability::{log_event_at, log_event_with_fields, Event, Severity};
use crate::txn::IsolationLevel;

/// Candidates retired between two interruption checks in `remove`.
const INTERRUPT_CHECK_INTERVAL: usize = 64;

/// Cloneable handle that interrupts a transaction's blocked write.
///
/// An interrupt is consumed by the next blocking point: a pending writer
/// gate acquisition, or the next batch of a running `remove`.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

/// A unit of isolated work against a `MemoryStore`.
pub struct Transaction {
    store: Arc<StoreInner>,
    id: u64,
    isolation: IsolationLevel,
    start: Option<SnapshotReservation>,
    pending: Option<Snapshot>,
    added: HashMap<u64, (StatementHandle, Arc<VersionedStatement>)>,
    removed: Vec<Arc<VersionedStatement>>,
    observed: Vec<QuadPattern>,
    namespace_changes: Vec<NamespaceChange>,
    interrupt: Arc<AtomicBool>,
    finished: bool,
}

impl Transaction {
    pub(crate) fn begin(store: Arc<StoreInner>, isolation: IsolationLevel) -> Self {
        let id = store.coordinator.allocate_tx_id();
        let start = isolation
            .uses_fixed_snapshot()
            .then(|| store.coordinator.reserve_current());

        store.metrics.increment_transactions_begun();
        let snapshot = start
            .as_ref()
            .map(|r| r.snapshot())
            .unwrap_or_else(|| store.coordinator.current());
        log_event_with_fields(
            Event::TxBegin,
            &[
                ("isolation", isolation.as_str()),
                ("snapshot", &snapshot.to_string()),
                ("tx", &id.to_string()),
            ],
        );

        Self {
            store,
            id,
            isolation,
            start,
            pending: None,
            added: HashMap::new(),
            removed: Vec::new(),
            observed: Vec::new(),
            namespace_changes: Vec::new(),
            interrupt: Arc::new(AtomicBool::new(false)),
            finished: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    /// Fixed read snapshot, for SNAPSHOT and SERIALIZABLE transactions.
    pub fn start_snapshot(&self) -> Option<Snapshot> {
        self.start.as_ref().map(|r| r.snapshot())
    }

    /// Snapshot this transaction's writes are stamped with, once it writes.
    pub fn pending_snapshot(&self) -> Option<Snapshot> {
        self.pending
    }

    pub fn is_writer(&self) -> bool {
        self.pending.is_some()
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            flag: Arc::clone(&self.interrupt),
        }
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Lazy sequence of the quads matching `pattern` in this transaction's
    /// view. Each call starts a new scan.
    pub fn get_statements(&mut self, pattern: &QuadPattern) -> StoreResult<StatementCursor> {
        self.ensure_open()?;
        self.observe(pattern);
        Ok(self.cursor(pattern))
    }

    /// True if at least one visible statement matches `pattern`.
    pub fn has_statement(&mut self, pattern: &QuadPattern) -> StoreResult<bool> {
        let mut cursor = self.get_statements(pattern)?;
        Ok(cursor.next_statement()?.is_some())
    }

    /// Number of visible explicit statements in the selected contexts.
    pub fn size(&mut self, context: ContextFilter) -> StoreResult<usize> {
        let pattern = QuadPattern::any().in_context(context).explicit_only();
        let mut cursor = self.get_statements(&pattern)?;
        let mut count = 0;
        while cursor.next_statement()?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    /// Distinct named graphs holding at least one visible statement.
    pub fn context_ids(&mut self) -> StoreResult<Vec<Term>> {
        let mut cursor = self.get_statements(&QuadPattern::any())?;
        let mut contexts = BTreeSet::new();
        while let Some(statement) = cursor.next_statement()? {
            if let Some(context) = statement.context() {
                if !contexts.contains(context.term()) {
                    contexts.insert(context.term().clone());
                }
            }
        }
        Ok(contexts.into_iter().collect())
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Add an explicit statement. Returns false if it already exists.
    pub fn add(
        &mut self,
        subject: &Term,
        predicate: &Term,
        object: &Term,
        context: Option<&Term>,
    ) -> StoreResult<bool> {
        self.insert(subject, predicate, object, context, true)
    }

    /// Add a statement derived by inference. Returns false if an explicit
    /// or inferred copy already exists.
    pub fn add_inferred(
        &mut self,
        subject: &Term,
        predicate: &Term,
        object: &Term,
        context: Option<&Term>,
    ) -> StoreResult<bool> {
        self.insert(subject, predicate, object, context, false)
    }

    pub fn add_quad(&mut self, quad: &Quad) -> StoreResult<bool> {
        self.add(&quad.subject, &quad.predicate, &quad.object, quad.context.as_ref())
    }

    /// Remove every visible statement matching `pattern`. Returns the
    /// number removed.
    ///
    /// If interrupted, the removals made by this call are undone before
    /// `Interrupted` is returned.
    pub fn remove(&mut self, pattern: &QuadPattern) -> StoreResult<usize> {
        self.ensure_open()?;
        self.observe(pattern);

        let candidates = {
            let (view, _held) = self.read_view();
            let mut found = Vec::new();
            for scan in self.scans(pattern) {
                self.store.visit_versions(&scan, |s| {
                    if s.is_visible(view) {
                        found.push(Arc::clone(s));
                    }
                    true
                });
            }
            found
        };
        if candidates.is_empty() {
            return Ok(0);
        }

        let pending = self.ensure_writer()?;
        self.check_interrupt()?;
        let count = self.retire_candidates(candidates, pending)?;
        self.store.metrics.add_statements_removed(count as u64);
        Ok(count)
    }

    /// Retire `candidates` at `pending`, checking for interruption between
    /// batches. On interruption every retire made here is undone.
    fn retire_candidates(
        &mut self,
        candidates: Vec<Arc<VersionedStatement>>,
        pending: Snapshot,
    ) -> StoreResult<usize> {
        let mut retired: Vec<Arc<VersionedStatement>> = Vec::new();
        let mut own: Vec<Arc<VersionedStatement>> = Vec::new();
        for (i, statement) in candidates.into_iter().enumerate() {
            if i > 0 && i % INTERRUPT_CHECK_INTERVAL == 0 {
                if let Err(e) = self.check_interrupt() {
                    for s in &retired {
                        self.store.statements.unmark_removed(s, pending);
                    }
                    return Err(e);
                }
            }
            if statement.since() == pending {
                own.push(statement);
            } else if self.store.statements.mark_removed(&statement, pending) {
                retired.push(statement);
            }
        }

        let count = retired.len() + self.purge_own(own);
        self.removed.extend(retired);
        Ok(count)
    }

    /// Remove every visible statement in the selected contexts.
    pub fn clear(&mut self, context: ContextFilter) -> StoreResult<usize> {
        self.remove(&QuadPattern::any().in_context(context))
    }

    // ---------------------------------------------------------------------
    // Namespaces
    // ---------------------------------------------------------------------

    pub fn set_namespace(&mut self, prefix: &str, name: &str) -> StoreResult<()> {
        self.change_namespaces(NamespaceChange::Set {
            prefix: prefix.to_string(),
            name: name.to_string(),
        })
    }

    pub fn remove_namespace(&mut self, prefix: &str) -> StoreResult<()> {
        self.change_namespaces(NamespaceChange::Remove {
            prefix: prefix.to_string(),
        })
    }

    pub fn clear_namespaces(&mut self) -> StoreResult<()> {
        self.change_namespaces(NamespaceChange::Clear)
    }

    /// Namespace bound to `prefix`, including this transaction's changes.
    pub fn namespace(&self, prefix: &str) -> Option<String> {
        self.namespaces().remove(prefix)
    }

    pub fn namespaces(&self) -> BTreeMap<String, String> {
        let mut entries = self.store.namespaces.list();
        apply_changes(&mut entries, &self.namespace_changes);
        entries
    }

    // ---------------------------------------------------------------------
    // Completion
    // ---------------------------------------------------------------------

    /// Make this transaction's writes visible to new readers.
    ///
    /// Returns the snapshot the writes were published at, or the current
    /// snapshot for a read-only transaction. A SERIALIZABLE transaction
    /// whose observations changed since it started is rolled back and
    /// fails with `Conflict`.
    pub fn commit(mut self) -> StoreResult<Snapshot> {
        self.ensure_open()?;

        let Some(pending) = self.pending else {
            self.finish();
            let current = self.store.coordinator.current();
            self.store.metrics.increment_transactions_committed();
            log_event_with_fields(
                Event::TxCommit,
                &[
                    ("read_only", "true"),
                    ("snapshot", &current.to_string()),
                    ("tx", &self.id.to_string()),
                ],
            );
            return Ok(current);
        };

        if self.isolation.detects_conflicts() {
            if let Some(reason) = self.find_conflict() {
                self.rollback_writes(pending);
                self.finish();
                self.store.metrics.increment_transactions_conflicted();
                log_event_at(
                    Severity::Warn,
                    Event::TxConflict,
                    &[("reason", &reason), ("tx", &self.id.to_string())],
                );
                return Err(StoreError::Conflict(reason));
            }
        }

        self.store.namespaces.apply(&self.namespace_changes);
        if let Err(e) = self.store.coordinator.publish(pending) {
            self.rollback_writes(pending);
            self.finish();
            return Err(e);
        }
        self.store.coordinator.release_writer(self.id);
        self.finish();

        self.store.metrics.increment_transactions_committed();
        log_event_with_fields(
            Event::TxCommit,
            &[
                ("added", &self.added.len().to_string()),
                ("removed", &self.removed.len().to_string()),
                ("snapshot", &pending.to_string()),
                ("tx", &self.id.to_string()),
            ],
        );

        if !self.removed.is_empty() {
            self.store.request_cleanup();
        }
        Ok(pending)
    }

    /// Discard every write of this transaction.
    pub fn rollback(mut self) -> StoreResult<()> {
        self.abort();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn ensure_open(&self) -> StoreResult<()> {
        if self.store.is_closed() {
            return Err(StoreError::StoreClosed(format!(
                "transaction {} used after store close",
                self.id
            )));
        }
        Ok(())
    }

    fn observe(&mut self, pattern: &QuadPattern) {
        if self.isolation.detects_conflicts() {
            self.observed.push(pattern.clone());
        }
    }

    fn view_at(&self, snapshot: Snapshot) -> ReadView {
        match self.pending {
            Some(pending) => ReadView::with_own_writes(snapshot, pending),
            None => ReadView::new(snapshot),
        }
    }

    /// The view of one read operation, and the reservation that keeps it
    /// valid.
    fn read_view(&self) -> (ReadView, SnapshotReservation) {
        let coordinator = &self.store.coordinator;
        match self.isolation {
            IsolationLevel::None => {
                let held = coordinator.reserve_current();
                (ReadView::new(held.snapshot().next()), held)
            }
            IsolationLevel::ReadCommitted => {
                let held = coordinator.reserve_current();
                (self.view_at(held.snapshot()), held)
            }
            IsolationLevel::Snapshot | IsolationLevel::Serializable => {
                let held = match &self.start {
                    Some(start) => coordinator.reserve(start.snapshot()),
                    None => coordinator.reserve_current(),
                };
                (self.view_at(held.snapshot()), held)
            }
        }
    }

    fn scans(&self, pattern: &QuadPattern) -> Vec<IdPattern> {
        if pattern.explicit == Some(false) && !self.store.may_have_inferred() {
            return Vec::new();
        }
        pattern.resolve(&self.store.interner)
    }

    fn cursor(&self, pattern: &QuadPattern) -> StatementCursor {
        let scans = self.scans(pattern);
        let (view, held) = self.read_view();
        StatementCursor::new(Arc::clone(&self.store), scans, view, held)
    }

    fn ensure_writer(&mut self) -> StoreResult<Snapshot> {
        if let Some(pending) = self.pending {
            return Ok(pending);
        }
        match self.store.coordinator.acquire_writer(self.id, &self.interrupt) {
            Ok(pending) => {
                self.pending = Some(pending);
                Ok(pending)
            }
            Err(e) => {
                self.note_interrupted(&e);
                Err(e)
            }
        }
    }

    fn check_interrupt(&self) -> StoreResult<()> {
        if self.interrupt.swap(false, Ordering::AcqRel) {
            let e = StoreError::Interrupted(format!("transaction {} interrupted", self.id));
            self.note_interrupted(&e);
            return Err(e);
        }
        Ok(())
    }

    fn note_interrupted(&self, error: &StoreError) {
        self.store.metrics.increment_operations_interrupted();
        log_event_at(
            Severity::Warn,
            Event::TxInterrupted,
            &[("reason", &error.to_string()), ("tx", &self.id.to_string())],
        );
    }

    fn change_namespaces(&mut self, change: NamespaceChange) -> StoreResult<()> {
        self.ensure_open()?;
        self.ensure_writer()?;
        self.check_interrupt()?;
        self.namespace_changes.push(change);
        Ok(())
    }

    fn insert(
        &mut self,
        subject: &Term,
        predicate: &Term,
        object: &Term,
        context: Option<&Term>,
        explicit: bool,
    ) -> StoreResult<bool> {
        self.ensure_open()?;
        validate_roles(subject, predicate, object, context)?;

        let context_filter = match context {
            Some(c) => ContextFilter::Named(c.clone()),
            None => ContextFilter::DefaultGraph,
        };
        self.observe(&QuadPattern::new(
            Some(subject.clone()),
            Some(predicate.clone()),
            Some(object.clone()),
            context_filter,
        ));

        let pending = self.ensure_writer()?;
        self.check_interrupt()?;

        let interner = &self.store.interner;
        let s = interner.intern(subject);
        let p = interner.intern(predicate);
        let o = interner.intern(object);
        let c = context.map(|c| interner.intern(c));

        let exact = IdPattern {
            subject: Some(s.id().value()),
            predicate: Some(p.id().value()),
            object: Some(o.id().value()),
            context: Some(c.as_ref().map(|c| c.id().value()).unwrap_or(TermId::DEFAULT_GRAPH)),
            explicit: None,
        };

        // Checked against both this transaction's view and the latest
        // committed state so that no quad ever has two live versions.
        let existing = {
            let (view, _held) = self.read_view();
            let latest = ReadView::with_own_writes(self.store.coordinator.current(), pending);
            let mut found = Vec::new();
            self.store.visit_versions(&exact, |v| {
                if v.is_visible(view) || v.is_visible(latest) {
                    found.push(Arc::clone(v));
                }
                true
            });
            found
        };
        if existing.iter().any(|v| v.is_explicit()) || (!explicit && !existing.is_empty()) {
            return Ok(false);
        }

        let statement = Arc::new(VersionedStatement::new(
            self.store.next_seq(),
            s,
            p,
            o,
            c,
            explicit,
            pending,
        ));
        let handle = self.store.statements.add(Arc::clone(&statement))?;
        self.store.indexes.insert(&statement);
        if !explicit {
            self.store.note_inferred();
        }
        self.added.insert(statement.seq(), (handle, statement));
        self.store.metrics.increment_statements_added();

        // An explicit add supersedes visible inferred copies.
        let mut own = Vec::new();
        for stale in existing {
            if stale.since() == pending {
                own.push(stale);
            } else if self.store.statements.mark_removed(&stale, pending) {
                self.removed.push(stale);
            }
        }
        self.purge_own(own);

        Ok(true)
    }

    /// Physically delete versions added by this transaction.
    fn purge_own(&mut self, statements: Vec<Arc<VersionedStatement>>) -> usize {
        let mut purged = Vec::with_capacity(statements.len());
        for statement in statements {
            if let Some((handle, own)) = self.added.remove(&statement.seq()) {
                if self.store.statements.purge(handle).is_some() {
                    purged.push(own);
                }
            }
        }
        self.store.indexes.remove_batch(&purged);
        purged.len()
    }

    /// Look for a version matching an observed pattern that a concurrent
    /// transaction added or removed after this one started.
    fn find_conflict(&self) -> Option<String> {
        let start = self.start_snapshot()?;
        let current = self.store.coordinator.current();
        if current <= start {
            return None;
        }
        let changed = |at: Snapshot| !at.is_unbounded() && at > start && at <= current;

        for pattern in &self.observed {
            for scan in pattern.resolve(&self.store.interner) {
                let mut hit = None;
                self.store.visit_versions(&scan, |v| {
                    if changed(v.since()) || changed(v.till()) {
                        hit = Some(v.to_quad());
                        return false;
                    }
                    true
                });
                if let Some(quad) = hit {
                    return Some(format!(
                        "{} changed after snapshot {} (now {})",
                        quad, start, current
                    ));
                }
            }
        }
        None
    }

    fn rollback_writes(&mut self, pending: Snapshot) {
        let store = &self.store;
        let mut undone = 0u64;
        for statement in self.removed.drain(..) {
            if store.statements.unmark_removed(&statement, pending) {
                undone += 1;
            }
        }

        let mut purged = Vec::with_capacity(self.added.len());
        for (_, (handle, statement)) in self.added.drain() {
            if store.statements.purge(handle).is_some() {
                purged.push(statement);
            }
        }
        store.indexes.remove_batch(&purged);
        undone += purged.len() as u64;

        store.metrics.add_statements_rolled_back(undone);
        self.namespace_changes.clear();
        self.pending = None;
        store.coordinator.release_writer(self.id);
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Some(mut start) = self.start.take() {
            start.release();
        }
    }

    fn abort(&mut self) {
        if self.finished {
            return;
        }
        if let Some(pending) = self.pending {
            self.rollback_writes(pending);
        }
        self.finish();
        self.store.metrics.increment_transactions_rolled_back();
        log_event_with_fields(Event::TxRollback, &[("tx", &self.id.to_string())]);
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.abort();
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("isolation", &self.isolation)
            .field("start", &self.start_snapshot())
            .field("pending", &self.pending)
            .field("added", &self.added.len())
            .field("removed", &self.removed.len())
            .finish()
    }
}

fn validate_roles(
    subject: &Term,
    predicate: &Term,
    object: &Term,
    context: Option<&Term>,
) -> StoreResult<()> {
    if !subject.is_resource() {
        return Err(StoreError::InvalidStatement(format!(
            "subject must be an IRI, blank node or triple: {}",
            subject
        )));
    }
    if let Term::Triple(triple) = subject {
        validate_roles(&triple.subject, &triple.predicate, &triple.object, None)?;
    }
    if !predicate.is_iri() {
        return Err(StoreError::InvalidStatement(format!(
            "predicate must be an IRI: {}",
            predicate
        )));
    }
    if let Term::Triple(triple) = object {
        validate_roles(&triple.subject, &triple.predicate, &triple.object, None)?;
    }
    if let Some(context) = context {
        if !context.is_graph_name() {
            return Err(StoreError::InvalidStatement(format!(
                "context must be an IRI or blank node: {}",
                context
            )));
        }
    }
    Ok(())
}

//! Versioned statements
//!
//! A `VersionedStatement` is one stored quad together with its version
//! interval `[since, till)`:
//! - `since` is fixed at creation to the snapshot of the adding writer
//! - `till` starts unbounded and is set at most once by a removing writer
//!
//! `till` is the only mutable part. It changes through compare-and-swap so
//! that a racing remover cannot overwrite another writer's retirement, and
//! a rollback can only restore the value it set itself.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::{ReadView, Snapshot, Visibility};
use crate::interner::{TermHandle, TermId};
use crate::model::Quad;

/// `till` of a statement purged while live. Above every snapshot the
/// counter can reach, and never passed to `retire`.
const PURGED_TILL: u64 = u64::MAX - 1;

/// Lifecycle of a stored statement relative to the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Added by the active writer, not yet committed.
    PendingAdd,
    /// Committed and not removed.
    Live,
    /// Removed by the active writer, not yet committed.
    PendingRemove,
    /// Removal committed. May still be visible to older snapshots.
    Retired,
    /// Physically removed from the store.
    Purged,
}

/// A stored statement and its version interval.
#[derive(Debug)]
pub struct VersionedStatement {
    seq: u64,
    subject: TermHandle,
    predicate: TermHandle,
    object: TermHandle,
    context: Option<TermHandle>,
    explicit: bool,
    since: Snapshot,
    till: AtomicU64,
    purged: AtomicBool,
}

impl VersionedStatement {
    /// Create a statement born at `since` and not yet removed.
    ///
    /// `seq` must be unique within the store; indexes use it to tell apart
    /// versions of the same quad.
    pub fn new(
        seq: u64,
        subject: TermHandle,
        predicate: TermHandle,
        object: TermHandle,
        context: Option<TermHandle>,
        explicit: bool,
        since: Snapshot,
    ) -> Self {
        Self {
            seq,
            subject,
            predicate,
            object,
            context,
            explicit,
            since,
            till: AtomicU64::new(Snapshot::UNBOUNDED.value()),
            purged: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[inline]
    pub fn subject(&self) -> &TermHandle {
        &self.subject
    }

    #[inline]
    pub fn predicate(&self) -> &TermHandle {
        &self.predicate
    }

    #[inline]
    pub fn object(&self) -> &TermHandle {
        &self.object
    }

    /// The named graph, `None` for the default graph.
    #[inline]
    pub fn context(&self) -> Option<&TermHandle> {
        self.context.as_ref()
    }

    /// False for statements derived by inference.
    #[inline]
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    #[inline]
    pub fn since(&self) -> Snapshot {
        self.since
    }

    #[inline]
    pub fn till(&self) -> Snapshot {
        Snapshot::new(self.till.load(Ordering::Acquire))
    }

    /// Set `till` to `at` if the statement has not been removed yet.
    ///
    /// Returns false if another removal already claimed it.
    pub fn retire(&self, at: Snapshot) -> bool {
        self.till
            .compare_exchange(
                Snapshot::UNBOUNDED.value(),
                at.value(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Undo a `retire(at)`. Fails if `till` is no longer `at`.
    pub fn restore(&self, at: Snapshot) -> bool {
        self.till
            .compare_exchange(
                at.value(),
                Snapshot::UNBOUNDED.value(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Mark the statement purged and claim `till` if still unbounded.
    ///
    /// Returns true if the statement was live, so exactly one of a racing
    /// `retire` and `claim_purge` takes it out of the live count.
    pub(crate) fn claim_purge(&self) -> bool {
        self.purged.store(true, Ordering::Release);
        self.till
            .compare_exchange(
                Snapshot::UNBOUNDED.value(),
                PURGED_TILL,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    #[inline]
    pub fn is_purged(&self) -> bool {
        self.purged.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_visible(&self, view: ReadView) -> bool {
        Visibility::is_visible(self.since, self.till(), view)
    }

    /// Lifecycle state given the latest committed snapshot.
    pub fn lifecycle(&self, current: Snapshot) -> LifecycleState {
        if self.is_purged() {
            return LifecycleState::Purged;
        }
        if self.since > current {
            return LifecycleState::PendingAdd;
        }
        let till = self.till();
        if till.is_unbounded() {
            LifecycleState::Live
        } else if till > current {
            LifecycleState::PendingRemove
        } else {
            LifecycleState::Retired
        }
    }

    /// Interned ids in subject, predicate, object, context order.
    /// The default graph is `TermId::DEFAULT_GRAPH`.
    pub fn key(&self) -> [u64; 4] {
        [
            self.subject.id().value(),
            self.predicate.id().value(),
            self.object.id().value(),
            self.context
                .as_ref()
                .map(|c| c.id().value())
                .unwrap_or(TermId::DEFAULT_GRAPH),
        ]
    }

    pub fn to_quad(&self) -> Quad {
        Quad::new(
            self.subject.term().clone(),
            self.predicate.term().clone(),
            self.object.term().clone(),
            self.context.as_ref().map(|c| c.term().clone()),
        )
    }
}

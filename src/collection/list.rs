//! Concurrent statement list
//!
//! An arena of slots holding `Arc<VersionedStatement>`. Slots are addressed
//! by generational handles: purging a slot bumps its generation, so a handle
//! to a purged statement never resolves to the statement that later reuses
//! the slot.
//!
//! Locking:
//! - segment directory: read-mostly `RwLock`, write-locked only to publish a
//!   new segment
//! - slot: one `Mutex` per slot, held for a single read or swap
//! - allocator: one `Mutex` around the free list, never held while a slot
//!   lock is being acquired

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::segment::{locate, segment_len, Segment};
use crate::mvcc::{Snapshot, VersionedStatement, Visibility};
use crate::store::{StoreError, StoreResult};

/// Stable reference to one slot occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementHandle {
    index: usize,
    generation: u32,
}

impl StatementHandle {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for StatementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}@{}", self.index, self.generation)
    }
}

#[derive(Debug, Default)]
struct SlotAllocator {
    free: BinaryHeap<Reverse<usize>>,
    next_unused: usize,
}

impl SlotAllocator {
    /// Lowest free index, else a fresh one past the high-water mark.
    fn take(&mut self) -> usize {
        match self.free.pop() {
            Some(Reverse(index)) => index,
            None => {
                let index = self.next_unused;
                self.next_unused += 1;
                index
            }
        }
    }

    fn release(&mut self, index: usize) {
        self.free.push(Reverse(index));
    }
}

/// Insertion-ordered, concurrently mutable statement container.
#[derive(Debug)]
pub struct StatementList {
    initial: usize,
    max_statements: Option<usize>,
    segments: RwLock<Vec<Arc<Segment>>>,
    allocator: Mutex<SlotAllocator>,
    occupied: AtomicUsize,
    live: AtomicUsize,
}

impl StatementList {
    /// Create an empty list. No slot memory is allocated until the first add.
    pub fn new(initial_capacity: usize, max_statements: Option<usize>) -> Self {
        Self {
            initial: initial_capacity.max(1),
            max_statements,
            segments: RwLock::new(Vec::new()),
            allocator: Mutex::new(SlotAllocator::default()),
            occupied: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
        }
    }

    /// Store `statement` in the lowest free slot, growing if none is free.
    ///
    /// On failure nothing is stored and the reserved index is returned to
    /// the free list.
    pub fn add(&self, statement: Arc<VersionedStatement>) -> StoreResult<StatementHandle> {
        self.reserve_capacity()?;

        let index = self.allocator.lock().take();
        let (segment, offset) = match self.segment_for(index) {
            Ok(found) => found,
            Err(e) => {
                self.abandon_slot(index);
                return Err(e);
            }
        };

        let Some(slot) = segment.slot(offset) else {
            self.abandon_slot(index);
            return Err(StoreError::fault(format!(
                "slot {} outside its segment",
                index
            )));
        };
        let mut state = slot.lock();
        if state.statement.is_some() {
            drop(state);
            self.occupied.fetch_sub(1, Ordering::AcqRel);
            return Err(StoreError::fault(format!(
                "free list handed out occupied slot {}",
                index
            )));
        }
        if statement.till().is_unbounded() {
            self.live.fetch_add(1, Ordering::AcqRel);
        }
        state.statement = Some(statement);

        Ok(StatementHandle {
            index,
            generation: state.generation,
        })
    }

    /// The statement behind `handle`, if the slot still holds it.
    pub fn get(&self, handle: StatementHandle) -> Option<Arc<VersionedStatement>> {
        let (k, offset) = locate(self.initial, handle.index);
        let segment = self.segments.read().get(k).cloned()?;
        let state = segment.slot(offset)?.lock();
        if state.generation != handle.generation {
            return None;
        }
        state.statement.clone()
    }

    /// Set `till = at` on the statement behind `handle`.
    ///
    /// Returns false if the handle is stale or the statement was already
    /// removed. Never deletes physically.
    pub fn remove(&self, handle: StatementHandle, at: Snapshot) -> bool {
        match self.get(handle) {
            Some(statement) => self.mark_removed(&statement, at),
            None => false,
        }
    }

    /// Retire `statement` at `at`, keeping the live count in step.
    pub fn mark_removed(&self, statement: &VersionedStatement, at: Snapshot) -> bool {
        if statement.is_purged() {
            return false;
        }
        if statement.retire(at) {
            self.live.fetch_sub(1, Ordering::AcqRel);
            true
        } else {
            false
        }
    }

    /// Undo `mark_removed(statement, at)`.
    pub fn unmark_removed(&self, statement: &VersionedStatement, at: Snapshot) -> bool {
        if statement.restore(at) {
            self.live.fetch_add(1, Ordering::AcqRel);
            true
        } else {
            false
        }
    }

    /// Physically delete the statement behind `handle`.
    ///
    /// Used by rollback for pending adds. Returns the purged statement.
    pub fn purge(&self, handle: StatementHandle) -> Option<Arc<VersionedStatement>> {
        let (k, offset) = locate(self.initial, handle.index);
        let segment = self.segments.read().get(k).cloned()?;
        let purged = {
            let mut state = segment.slot(offset)?.lock();
            if state.generation != handle.generation {
                return None;
            }
            let taken = state.statement.take()?;
            state.generation = state.generation.wrapping_add(1);
            taken
        };
        self.release_slot(handle.index, &purged);
        Some(purged)
    }

    /// Physically delete every statement with `till <= below`.
    ///
    /// `below` must not exceed the current snapshot: a pending removal is
    /// stamped with the next snapshot and is therefore never matched. Each
    /// purged statement is handed to `on_purge` after its slot is released.
    /// Returns the number purged.
    pub fn clean_snapshots<F>(&self, below: Snapshot, mut on_purge: F) -> usize
    where
        F: FnMut(Arc<VersionedStatement>),
    {
        if below.is_unbounded() {
            return 0;
        }

        let segments = self.segments.read().clone();
        let mut purged = 0;

        for (k, segment) in segments.iter().enumerate() {
            let base = self.initial * ((1usize << k) - 1);
            for offset in 0..segment.len() {
                let Some(slot) = segment.slot(offset) else {
                    continue;
                };
                let taken = {
                    let mut state = slot.lock();
                    let dead = state
                        .statement
                        .as_ref()
                        .map(|s| Visibility::is_dead_below(s.till(), below))
                        .unwrap_or(false);
                    if dead {
                        state.generation = state.generation.wrapping_add(1);
                        state.statement.take()
                    } else {
                        None
                    }
                };
                if let Some(statement) = taken {
                    self.release_slot(base + offset, &statement);
                    purged += 1;
                    on_purge(statement);
                }
            }
        }

        purged
    }

    /// Lazy sequence of occupied slots in index order.
    ///
    /// The iterator works on a copy of the segment directory, so it is
    /// unaffected by concurrent growth; each slot is read at the moment the
    /// iterator reaches it. Call again to restart.
    pub fn iter(&self) -> StatementIter {
        StatementIter {
            segments: self.segments.read().clone(),
            initial: self.initial,
            segment: 0,
            offset: 0,
        }
    }

    /// Statements not yet removed, including pending adds.
    pub fn len(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physically occupied slots, including retired statements awaiting
    /// cleanup.
    pub fn occupied(&self) -> usize {
        self.occupied.load(Ordering::Acquire)
    }

    /// Allocated slots across all segments.
    pub fn capacity(&self) -> usize {
        self.segments.read().iter().map(|s| s.len()).sum()
    }

    fn reserve_capacity(&self) -> StoreResult<()> {
        let max = self.max_statements;
        self.occupied
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| match max {
                Some(limit) if n >= limit => None,
                _ => Some(n + 1),
            })
            .map(|_| ())
            .map_err(|n| StoreError::Capacity(format!("statement limit reached ({} slots)", n)))
    }

    fn segment_for(&self, index: usize) -> StoreResult<(Arc<Segment>, usize)> {
        let (k, offset) = locate(self.initial, index);
        if let Some(segment) = self.segments.read().get(k) {
            return Ok((Arc::clone(segment), offset));
        }

        let mut segments = self.segments.write();
        while segments.len() <= k {
            let len = segment_len(self.initial, segments.len())
                .ok_or_else(|| StoreError::Capacity("segment size overflow".into()))?;
            segments
                .try_reserve(1)
                .map_err(|e| StoreError::Capacity(format!("segment directory: {}", e)))?;
            segments.push(Arc::new(Segment::allocate(len)?));
        }
        segments
            .get(k)
            .map(|segment| (Arc::clone(segment), offset))
            .ok_or_else(|| StoreError::fault(format!("segment {} missing after growth", k)))
    }

    fn release_slot(&self, index: usize, statement: &VersionedStatement) {
        if statement.claim_purge() {
            self.live.fetch_sub(1, Ordering::AcqRel);
        }
        self.abandon_slot(index);
    }

    /// Return a reserved index and its occupancy count.
    fn abandon_slot(&self, index: usize) {
        self.occupied.fetch_sub(1, Ordering::AcqRel);
        self.allocator.lock().release(index);
    }
}

/// Iterator over `(handle, statement)` pairs of occupied slots.
pub struct StatementIter {
    segments: Vec<Arc<Segment>>,
    initial: usize,
    segment: usize,
    offset: usize,
}

impl Iterator for StatementIter {
    type Item = (StatementHandle, Arc<VersionedStatement>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(segment) = self.segments.get(self.segment) {
            while self.offset < segment.len() {
                let offset = self.offset;
                self.offset += 1;
                let Some(slot) = segment.slot(offset) else {
                    continue;
                };
                let state = slot.lock();
                if let Some(statement) = &state.statement {
                    let base = self.initial * ((1usize << self.segment) - 1);
                    return Some((
                        StatementHandle {
                            index: base + offset,
                            generation: state.generation,
                        },
                        Arc::clone(statement),
                    ));
                }
            }
            self.segment += 1;
            self.offset = 0;
        }
        None
    }
}

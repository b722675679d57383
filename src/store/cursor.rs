//! Lazy statement cursor
//!
//! A cursor walks one or more id patterns through the pattern indexes in
//! bounded batches, keeping only versions visible in its read view. It
//! holds a snapshot reservation for its whole lifetime so the cleaner never
//! purges a version it may still return.
//!
//! Each call to `Transaction::get_statements` builds a fresh cursor; a
//! cursor itself is not rewindable.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::errors::{StoreError, StoreResult};
use super::memory_store::StoreInner;
use crate::index::{IdPattern, IndexKey};
use crate::model::Quad;
use crate::mvcc::{ReadView, SnapshotReservation, VersionedStatement};

/// Cloneable handle that cancels a cursor from another thread.
#[derive(Debug, Clone, Default)]
pub struct CursorCancel {
    flag: Arc<AtomicBool>,
}

impl CursorCancel {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Iterator over the quads matching a pattern in one read view.
///
/// Yields `Err(Interrupted)` once after being cancelled, then ends.
pub struct StatementCursor {
    store: Arc<StoreInner>,
    scans: VecDeque<IdPattern>,
    resume: Option<IndexKey>,
    buffer: VecDeque<Arc<VersionedStatement>>,
    view: ReadView,
    reservation: Option<SnapshotReservation>,
    cancel: CursorCancel,
    batch_size: usize,
    closed: bool,
}

impl StatementCursor {
    pub(crate) fn new(
        store: Arc<StoreInner>,
        scans: Vec<IdPattern>,
        view: ReadView,
        reservation: SnapshotReservation,
    ) -> Self {
        let batch_size = store.config.iterator_batch_size;
        Self {
            store,
            scans: scans.into(),
            resume: None,
            buffer: VecDeque::new(),
            view,
            reservation: Some(reservation),
            cancel: CursorCancel::default(),
            batch_size,
            closed: false,
        }
    }

    /// The view this cursor filters with.
    pub fn view(&self) -> ReadView {
        self.view
    }

    pub fn cancel_handle(&self) -> CursorCancel {
        self.cancel.clone()
    }

    /// Stop iterating and release the snapshot reservation. Idempotent.
    pub fn close(&mut self) {
        self.closed = true;
        self.scans.clear();
        self.buffer.clear();
        self.resume = None;
        if let Some(mut reservation) = self.reservation.take() {
            reservation.release();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Next visible version, without materializing its quad.
    pub(crate) fn next_statement(&mut self) -> StoreResult<Option<Arc<VersionedStatement>>> {
        if self.closed {
            return Ok(None);
        }
        if self.cancel.is_cancelled() {
            self.close();
            return Err(StoreError::Interrupted("cursor cancelled".into()));
        }
        if self.store.is_closed() {
            self.close();
            return Err(StoreError::StoreClosed("store closed during iteration".into()));
        }

        while self.buffer.is_empty() {
            let Some(pattern) = self.scans.front().copied() else {
                self.close();
                return Ok(None);
            };
            let batch = self
                .store
                .indexes
                .scan_batch(&pattern, self.resume.as_ref(), self.batch_size);
            let view = self.view;
            self.buffer.extend(
                batch
                    .statements
                    .into_iter()
                    .filter(|s| !s.is_purged() && s.is_visible(view)),
            );
            match batch.resume {
                Some(key) => self.resume = Some(key),
                None => {
                    self.scans.pop_front();
                    self.resume = None;
                }
            }
        }

        Ok(self.buffer.pop_front())
    }
}

impl Iterator for StatementCursor {
    type Item = StoreResult<Quad>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_statement() {
            Ok(Some(statement)) => Some(Ok(statement.to_quad())),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl Drop for StatementCursor {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for StatementCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementCursor")
            .field("view", &self.view)
            .field("pending_scans", &self.scans.len())
            .field("buffered", &self.buffer.len())
            .field("closed", &self.closed)
            .finish()
    }
}

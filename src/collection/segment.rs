//! Fixed-size slot segments
//!
//! Segment `k` of a list with initial capacity `n` holds `n * 2^k` slots and
//! covers global indexes `n * (2^k - 1) .. n * (2^(k+1) - 1)`. Segments are
//! never moved or resized once published, so a slot index resolves to the
//! same memory for the lifetime of the list.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::mvcc::VersionedStatement;
use crate::store::{StoreError, StoreResult};

/// Contents of one slot.
#[derive(Debug, Default)]
pub(crate) struct SlotState {
    pub(crate) generation: u32,
    pub(crate) statement: Option<Arc<VersionedStatement>>,
}

#[derive(Debug)]
pub(crate) struct Segment {
    slots: Box<[Mutex<SlotState>]>,
}

impl Segment {
    /// Allocate a segment of `len` empty slots, reporting allocation failure
    /// instead of aborting.
    pub(crate) fn allocate(len: usize) -> StoreResult<Self> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(len).map_err(|e| {
            StoreError::Capacity(format!("cannot allocate segment of {} slots: {}", len, e))
        })?;
        slots.extend((0..len).map(|_| Mutex::new(SlotState::default())));
        Ok(Self {
            slots: slots.into_boxed_slice(),
        })
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn slot(&self, offset: usize) -> Option<&Mutex<SlotState>> {
        self.slots.get(offset)
    }
}

/// Map a global slot index to `(segment, offset)`.
#[inline]
pub(crate) fn locate(initial: usize, index: usize) -> (usize, usize) {
    let q = index / initial + 1;
    let segment = (usize::BITS - 1 - q.leading_zeros()) as usize;
    let base = initial * ((1usize << segment) - 1);
    (segment, index - base)
}

/// Number of slots in segment `k`, `None` on overflow.
#[inline]
pub(crate) fn segment_len(initial: usize, segment: usize) -> Option<usize> {
    let factor = 1usize.checked_shl(segment as u32)?;
    initial.checked_mul(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_first_segment() {
        assert_eq!(locate(4, 0), (0, 0));
        assert_eq!(locate(4, 3), (0, 3));
    }

    #[test]
    fn test_locate_boundaries() {
        // initial 2: [0,1] [2..6) [6..14)
        assert_eq!(locate(2, 2), (1, 0));
        assert_eq!(locate(2, 5), (1, 3));
        assert_eq!(locate(2, 6), (2, 0));
        assert_eq!(locate(2, 13), (2, 7));
        assert_eq!(locate(2, 14), (3, 0));
    }

    #[test]
    fn test_locate_is_consistent_with_lengths() {
        let initial = 3;
        let mut index = 0;
        for k in 0..6 {
            let len = segment_len(initial, k).unwrap();
            for offset in 0..len {
                assert_eq!(locate(initial, index), (k, offset));
                index += 1;
            }
        }
    }

    #[test]
    fn test_segment_len_overflow() {
        assert_eq!(segment_len(256, 2), Some(1024));
        assert_eq!(segment_len(usize::MAX, 1), None);
        assert_eq!(segment_len(1, 200), None);
    }

    #[test]
    fn test_allocate_empty_slots() {
        let segment = Segment::allocate(8).unwrap();
        assert_eq!(segment.len(), 8);
        assert!(segment.slot(7).unwrap().lock().statement.is_none());
        assert!(segment.slot(8).is_none());
    }
}

//! MVCC Visibility - Deterministic snapshot isolation
//!
//! ## Visibility Rule
//!
//! A version with interval `[since, till)` is visible to a read view with
//! snapshot `S` and optional own-writes marker `W` iff:
//! 1. it is born: `since <= S` or `since == W`
//! 2. it is not dead: `till > S` and `till != W`
//!
//! Without an own-writes marker this is exactly `since <= S < till`.
//!
//! ## Guarantees
//!
//! - Readers observe a stable snapshot
//! - Reads never block writes
//! - No partial visibility of a transaction: every pending version of one
//!   writer carries the same marker and becomes visible with one counter
//!   store
//! - Visibility never depends on wall-clock time or index state

use super::{ReadView, Snapshot};

/// Stateless visibility resolver.
///
/// Visibility is evaluated identically every time for identical inputs.
pub struct Visibility;

impl Visibility {
    /// Evaluate the visibility rule for one version interval.
    #[inline]
    pub fn is_visible(since: Snapshot, till: Snapshot, view: ReadView) -> bool {
        let snapshot = view.snapshot();
        let own = view.own_writes();

        let born = since <= snapshot || own == Some(since);
        let dead = till <= snapshot || own == Some(till);
        born && !dead
    }

    /// True if no read view at or above `floor` can see a version retired
    /// at `till`.
    #[inline]
    pub fn is_dead_below(till: Snapshot, floor: Snapshot) -> bool {
        !till.is_unbounded() && till <= floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: u64) -> Snapshot {
        Snapshot::new(v)
    }

    #[test]
    fn test_visible_within_interval() {
        let view = ReadView::new(s(5));
        assert!(Visibility::is_visible(s(5), Snapshot::UNBOUNDED, view));
        assert!(Visibility::is_visible(s(1), s(6), view));
    }

    #[test]
    fn test_excludes_future_births() {
        let view = ReadView::new(s(5));
        assert!(!Visibility::is_visible(s(6), Snapshot::UNBOUNDED, view));
    }

    #[test]
    fn test_excludes_past_deaths() {
        let view = ReadView::new(s(5));
        assert!(!Visibility::is_visible(s(1), s(5), view));
        assert!(!Visibility::is_visible(s(1), s(2), view));
    }

    #[test]
    fn test_half_open_boundaries() {
        // [5, 9) is visible to 5..=8 exactly
        for snapshot in 0..12 {
            let visible = Visibility::is_visible(s(5), s(9), ReadView::new(s(snapshot)));
            assert_eq!(visible, (5..9).contains(&snapshot), "snapshot {}", snapshot);
        }
    }

    #[test]
    fn test_own_pending_add_visible_to_writer_only() {
        let writer = ReadView::with_own_writes(s(3), s(8));
        let reader = ReadView::new(s(7));
        assert!(Visibility::is_visible(s(8), Snapshot::UNBOUNDED, writer));
        assert!(!Visibility::is_visible(s(8), Snapshot::UNBOUNDED, reader));
    }

    #[test]
    fn test_own_pending_remove_hidden_from_writer_only() {
        let writer = ReadView::with_own_writes(s(7), s(8));
        let reader = ReadView::new(s(7));
        assert!(!Visibility::is_visible(s(2), s(8), writer));
        assert!(Visibility::is_visible(s(2), s(8), reader));
    }

    #[test]
    fn test_writer_with_old_snapshot_ignores_other_commits() {
        // Writer started at 3; a statement committed at 5 stays invisible.
        let writer = ReadView::with_own_writes(s(3), s(6));
        assert!(!Visibility::is_visible(s(5), Snapshot::UNBOUNDED, writer));
    }

    #[test]
    fn test_dead_below_floor() {
        assert!(Visibility::is_dead_below(s(8), s(8)));
        assert!(Visibility::is_dead_below(s(8), s(9)));
        assert!(!Visibility::is_dead_below(s(9), s(8)));
        assert!(!Visibility::is_dead_below(Snapshot::UNBOUNDED, s(u64::MAX - 1)));
    }

    #[test]
    fn test_visibility_is_deterministic() {
        let view = ReadView::new(s(50));
        for _ in 0..100 {
            assert!(Visibility::is_visible(s(10), s(60), view));
        }
    }
}

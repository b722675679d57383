//! Compaction Safety Tests
//!
//! After a clean pass at `K` no version with `till <= K` remains and no
//! version with `till > K` is removed.

use aerordf::{MemoryStore, QuadPattern, Snapshot, StoreConfig, Term, Transaction};

// =============================================================================
// Helper Functions
// =============================================================================

fn store() -> MemoryStore {
    MemoryStore::new(StoreConfig {
        background_cleanup: false,
        initial_capacity: 4,
        ..StoreConfig::default()
    })
    .unwrap()
}

fn iri(name: &str) -> Term {
    Term::iri(format!("http://ex/{}", name))
}

fn add_one(store: &MemoryStore, name: &str) -> Snapshot {
    let mut tx = store.begin().unwrap();
    assert!(tx.add(&iri(name), &iri("p"), &iri("o"), None).unwrap());
    tx.commit().unwrap()
}

fn remove_one(store: &MemoryStore, name: &str) -> Snapshot {
    let mut tx = store.begin().unwrap();
    assert_eq!(tx.remove(&QuadPattern::any().with_subject(iri(name))).unwrap(), 1);
    tx.commit().unwrap()
}

fn count(tx: &mut Transaction) -> usize {
    tx.get_statements(&QuadPattern::any()).unwrap().count()
}

// =============================================================================
// Scenarios
// =============================================================================

/// Added at 5, removed at 9: clean(8) retains it, clean(9) purges it.
#[test]
fn test_add_at_five_remove_at_nine() {
    let store = store();
    for n in 1..=4 {
        add_one(&store, &format!("filler{}", n));
    }
    assert_eq!(add_one(&store, "target"), Snapshot::new(5));
    for n in 6..=8 {
        add_one(&store, &format!("filler{}", n));
    }
    assert_eq!(remove_one(&store, "target"), Snapshot::new(9));
    assert_eq!(store.stats().occupied_slots, 8);

    let report = store.clean_snapshots_below(Snapshot::new(8)).unwrap();
    assert_eq!(report.floor, Snapshot::new(8));
    assert_eq!(report.purged, 0);
    assert_eq!(store.stats().occupied_slots, 8);

    let report = store.clean_snapshots_below(Snapshot::new(9)).unwrap();
    assert_eq!(report.purged, 1);
    assert_eq!(store.stats().occupied_slots, 7);
    assert_eq!(store.stats().index_entries, 7);
}

/// The requested limit is lowered to the oldest reader's snapshot.
#[test]
fn test_limit_clamped_to_reader() {
    let store = store();
    add_one(&store, "a");
    let mut reader = store.begin().unwrap();
    remove_one(&store, "a");

    let report = store.clean_snapshots_below(Snapshot::new(100)).unwrap();
    assert_eq!(report.floor, Snapshot::new(1));
    assert_eq!(report.purged, 0);
    assert_eq!(count(&mut reader), 1);

    drop(reader);
    assert_eq!(store.clean_snapshots().unwrap().purged, 1);
}

/// Every K from 0 to the last commit: exactly the versions with
/// `till <= K` are purged, checked against a reader pinned at K.
#[test]
fn test_clean_exactly_below_floor() {
    const COMMITS: u64 = 12;

    for k in 0..=COMMITS {
        let store = store();
        let mut tills = Vec::new();
        let mut pinned = None;

        // Commit i adds "i"; every even commit also removes "i-1".
        for i in 1..=COMMITS {
            let mut tx = store.begin().unwrap();
            tx.add(&iri(&i.to_string()), &iri("p"), &iri("o"), None).unwrap();
            tills.push(u64::MAX);
            if i % 2 == 0 {
                tx.remove(&QuadPattern::any().with_subject(iri(&(i - 1).to_string())))
                    .unwrap();
                tills[(i - 2) as usize] = i;
            }
            tx.commit().unwrap();
            if i == k {
                pinned = Some(store.begin().unwrap());
            }
        }
        if k == 0 {
            continue;
        }
        let mut pinned = pinned.unwrap();
        let visible_before = count(&mut pinned);

        let report = store.clean_snapshots_below(Snapshot::new(k)).unwrap();
        let dead = tills.iter().filter(|&&t| t <= k).count();
        assert_eq!(report.purged, dead, "K={}", k);
        assert_eq!(
            store.stats().occupied_slots,
            tills.len() - dead,
            "K={}",
            k
        );
        assert_eq!(count(&mut pinned), visible_before, "K={}", k);
    }
}

/// A rolled-back transaction leaves no slot and no index entry behind.
#[test]
fn test_rollback_leaks_nothing() {
    let store = store();
    add_one(&store, "keep");

    let mut tx = store.begin().unwrap();
    for n in 0..50 {
        tx.add(&iri(&format!("tmp{}", n)), &iri("p"), &iri("o"), None).unwrap();
    }
    tx.remove(&QuadPattern::any().with_subject(iri("keep"))).unwrap();
    tx.rollback().unwrap();

    let stats = store.stats();
    assert_eq!(stats.occupied_slots, 1);
    assert_eq!(stats.live_statements, 1);
    assert_eq!(stats.index_entries, 1);
    assert_eq!(store.clean_snapshots().unwrap().purged, 0);
}

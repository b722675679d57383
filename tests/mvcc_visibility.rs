//! MVCC Visibility Tests
//!
//! A statement is returned to a reader holding snapshot `S` iff
//! `since <= S < till`:
//! - the pure rule over intervals
//! - the same rule observed through open transactions of a live store

use std::collections::{BTreeMap, BTreeSet};

use aerordf::mvcc::{ReadView, Snapshot, Visibility};
use aerordf::{IsolationLevel, MemoryStore, QuadPattern, StoreConfig, Term, Transaction};

// =============================================================================
// Helper Functions
// =============================================================================

fn store() -> MemoryStore {
    MemoryStore::new(StoreConfig {
        background_cleanup: false,
        ..StoreConfig::default()
    })
    .unwrap()
}

fn subject(n: u64) -> Term {
    Term::iri(format!("http://ex/s{}", n))
}

fn predicate() -> Term {
    Term::iri("http://ex/p")
}

fn object() -> Term {
    Term::literal("o")
}

fn visible_subjects(tx: &mut Transaction) -> BTreeSet<Term> {
    tx.get_statements(&QuadPattern::any())
        .unwrap()
        .map(|q| q.unwrap().subject)
        .collect()
}

// =============================================================================
// Rule
// =============================================================================

/// Exhaustive check of the rule against its closed form on a small grid.
#[test]
fn test_rule_matches_interval_membership() {
    let unbounded = Snapshot::UNBOUNDED.value();
    for since in 1..8u64 {
        for till in (since + 1..9).chain([unbounded]) {
            for s in 0..10u64 {
                let view = ReadView::new(Snapshot::new(s));
                let expected = since <= s && s < till;
                assert_eq!(
                    Visibility::is_visible(Snapshot::new(since), Snapshot::new(till), view),
                    expected,
                    "since={} till={} S={}",
                    since,
                    till,
                    s
                );
            }
        }
    }
}

/// Own pending writes are visible to their writer only.
#[test]
fn test_own_writes_marker() {
    let pending = Snapshot::new(6);
    let writer = ReadView::with_own_writes(Snapshot::new(5), pending);
    let other = ReadView::new(Snapshot::new(5));

    assert!(Visibility::is_visible(pending, Snapshot::UNBOUNDED, writer));
    assert!(!Visibility::is_visible(pending, Snapshot::UNBOUNDED, other));

    assert!(!Visibility::is_visible(Snapshot::new(2), pending, writer));
    assert!(Visibility::is_visible(Snapshot::new(2), pending, other));
}

// =============================================================================
// Store
// =============================================================================

/// Commit k adds statement k and removes statement k-3. A SNAPSHOT reader
/// opened after every commit must keep seeing exactly its interval set,
/// including after a clean pass.
#[test]
fn test_open_readers_see_their_snapshot() {
    let store = store();
    let mut intervals: BTreeMap<u64, (u64, u64)> = BTreeMap::new();
    let mut readers: Vec<(u64, Transaction)> = Vec::new();

    for k in 1..=20u64 {
        let mut tx = store.begin().unwrap();
        tx.add(&subject(k), &predicate(), &object(), None).unwrap();
        if k > 3 {
            let removed = tx
                .remove(&QuadPattern::any().with_subject(subject(k - 3)))
                .unwrap();
            assert_eq!(removed, 1);
            intervals.entry(k - 3).and_modify(|e| e.1 = k);
        }
        let committed = tx.commit().unwrap();
        assert_eq!(committed, Snapshot::new(k));
        intervals.insert(k, (k, u64::MAX));

        readers.push((k, store.open_transaction(IsolationLevel::Snapshot).unwrap()));
    }

    store.clean_snapshots().unwrap();

    for (s, reader) in readers.iter_mut() {
        let expected: BTreeSet<Term> = intervals
            .iter()
            .filter(|(_, (since, till))| *since <= *s && *s < *till)
            .map(|(n, _)| subject(*n))
            .collect();
        assert_eq!(visible_subjects(reader), expected, "reader at {}", s);
    }
}

/// Repeated reads inside one SNAPSHOT transaction are stable.
#[test]
fn test_repeatable_reads() {
    let store = store();
    let mut reader = store.begin().unwrap();
    let before = visible_subjects(&mut reader);

    let mut tx = store.begin().unwrap();
    tx.add(&subject(1), &predicate(), &object(), None).unwrap();
    tx.commit().unwrap();

    assert_eq!(visible_subjects(&mut reader), before);
    assert!(visible_subjects(&mut store.begin().unwrap()).contains(&subject(1)));
}

//! Conservation Under Concurrency
//!
//! N statements added and M removed by concurrent transactions leave
//! `size() == N - M`; after a clean pass the occupied slots equal the live
//! count.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use rand::seq::SliceRandom;
use rand::thread_rng;

use aerordf::{ContextFilter, IsolationLevel, MemoryStore, QuadPattern, StoreConfig, Term};

const BASE: usize = 200;
const ADDERS: usize = 4;
const PER_ADDER: usize = 200;
const BATCH: usize = 25;
const REMOVERS: usize = 2;

fn subject(prefix: &str, n: usize) -> Term {
    Term::iri(format!("http://ex/{}/{}", prefix, n))
}

fn store() -> Arc<MemoryStore> {
    Arc::new(
        MemoryStore::new(StoreConfig {
            background_cleanup: false,
            initial_capacity: 16,
            lock_timeout_ms: 60_000,
            ..StoreConfig::default()
        })
        .unwrap(),
    )
}

#[test]
fn test_concurrent_adds_and_removes_conserve_count() {
    let store = store();
    let p = Term::iri("http://ex/p");
    let o = Term::literal("v");

    let mut tx = store.begin().unwrap();
    for n in 0..BASE {
        tx.add(&subject("base", n), &p, &o, None).unwrap();
    }
    tx.commit().unwrap();

    let mut doomed: Vec<usize> = (0..BASE).collect();
    doomed.shuffle(&mut thread_rng());
    let shares: Vec<Vec<usize>> = doomed
        .chunks(BASE / REMOVERS)
        .map(|c| c.to_vec())
        .collect();

    let mut workers = Vec::new();

    for a in 0..ADDERS {
        let store = Arc::clone(&store);
        let (p, o) = (p.clone(), o.clone());
        workers.push(thread::spawn(move || {
            let mut ids: Vec<usize> = (0..PER_ADDER).collect();
            ids.shuffle(&mut thread_rng());
            for chunk in ids.chunks(BATCH) {
                let mut tx = store.begin().unwrap();
                for n in chunk {
                    let added = tx
                        .add(&subject(&format!("adder{}", a), *n), &p, &o, None)
                        .unwrap();
                    assert!(added);
                }
                tx.commit().unwrap();
            }
        }));
    }

    for share in shares {
        let store = Arc::clone(&store);
        workers.push(thread::spawn(move || {
            for n in share {
                let mut tx = store.begin().unwrap();
                let removed = tx
                    .remove(&QuadPattern::any().with_subject(subject("base", n)))
                    .unwrap();
                assert_eq!(removed, 1);
                tx.commit().unwrap();
            }
        }));
    }

    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let mut last = 0;
            let mut tx = store.open_transaction(IsolationLevel::ReadCommitted).unwrap();
            for _ in 0..50 {
                let size = tx.size(ContextFilter::Any).unwrap();
                assert!(size <= BASE + ADDERS * PER_ADDER);
                last = size;
            }
            last
        })
    };

    for worker in workers {
        worker.join().unwrap();
    }
    reader.join().unwrap();

    let expected = BASE + ADDERS * PER_ADDER - BASE;
    let mut tx = store.begin().unwrap();
    assert_eq!(tx.size(ContextFilter::Any).unwrap(), expected);
    drop(tx);

    store.clean_snapshots().unwrap();
    let stats = store.stats();
    assert_eq!(stats.occupied_slots, stats.live_statements);
    assert_eq!(stats.live_statements, expected);
    assert_eq!(stats.index_entries, expected);
}

/// Freed slots are reused, so capacity stops growing under steady churn.
#[test]
fn test_churn_reuses_slots() {
    let store = store();
    let p = Term::iri("http://ex/p");
    let o = Term::literal("v");

    for round in 0..20 {
        let mut tx = store.begin().unwrap();
        for n in 0..50 {
            tx.add(&subject(&format!("r{}", round), n), &p, &o, None).unwrap();
        }
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        tx.clear(ContextFilter::Any).unwrap();
        tx.commit().unwrap();
        store.clean_snapshots().unwrap();
    }

    let stats = store.stats();
    assert_eq!(stats.occupied_slots, 0);
    assert!(stats.slot_capacity <= 16 + 32 + 64);
}

/// Clean passes running alongside writers never purge anything a pinned
/// reader or the latest snapshot can still see.
#[test]
fn test_clean_concurrent_with_writers() {
    let store = store();
    let p = Term::iri("http://ex/p");
    let o = Term::literal("v");

    let mut tx = store.begin().unwrap();
    for n in 0..BASE {
        tx.add(&subject("base", n), &p, &o, None).unwrap();
    }
    tx.commit().unwrap();

    let mut pinned = store.open_transaction(IsolationLevel::Snapshot).unwrap();
    assert_eq!(pinned.size(ContextFilter::Any).unwrap(), BASE);

    let stop = Arc::new(AtomicBool::new(false));
    let cleaner = {
        let store = Arc::clone(&store);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut passes = 0;
            while !stop.load(Ordering::Acquire) {
                store.clean_snapshots().unwrap();
                passes += 1;
            }
            passes
        })
    };

    let mut workers = Vec::new();
    for a in 0..ADDERS {
        let store = Arc::clone(&store);
        let (p, o) = (p.clone(), o.clone());
        workers.push(thread::spawn(move || {
            for chunk in (0..PER_ADDER).collect::<Vec<_>>().chunks(BATCH) {
                let mut tx = store.begin().unwrap();
                for n in chunk {
                    tx.add(&subject(&format!("c{}", a), *n), &p, &o, None).unwrap();
                }
                tx.commit().unwrap();
            }
        }));
    }
    {
        let store = Arc::clone(&store);
        workers.push(thread::spawn(move || {
            let mut doomed: Vec<usize> = (0..BASE).collect();
            doomed.shuffle(&mut thread_rng());
            for n in doomed {
                let mut tx = store.begin().unwrap();
                let pattern = QuadPattern::any().with_subject(subject("base", n));
                assert_eq!(tx.remove(&pattern).unwrap(), 1);
                tx.commit().unwrap();
            }
        }));
    }

    for _ in 0..20 {
        assert_eq!(pinned.size(ContextFilter::Any).unwrap(), BASE);
        thread::yield_now();
    }
    for worker in workers {
        worker.join().unwrap();
    }
    stop.store(true, Ordering::Release);
    assert!(cleaner.join().unwrap() > 0);

    assert_eq!(pinned.size(ContextFilter::Any).unwrap(), BASE);
    let stats = store.stats();
    assert_eq!(stats.occupied_slots, BASE + ADDERS * PER_ADDER);
    assert_eq!(stats.index_entries, stats.occupied_slots);
    drop(pinned);

    store.clean_snapshots().unwrap();
    let expected = ADDERS * PER_ADDER;
    let stats = store.stats();
    assert_eq!(stats.live_statements, expected);
    assert_eq!(stats.occupied_slots, expected);
    assert_eq!(stats.index_entries, expected);
    let mut tx = store.begin().unwrap();
    assert_eq!(tx.size(ContextFilter::Any).unwrap(), expected);
}

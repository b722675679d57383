//! Interning Tests
//!
//! - structurally equal terms share one canonical handle
//! - a term is reclaimed after its last reference drops and is replaced by
//!   a fresh handle when seen again

use std::sync::Arc;
use std::thread;

use aerordf::interner::ValueInterner;
use aerordf::{MemoryStore, QuadPattern, StoreConfig, Term};

#[test]
fn test_intern_is_idempotent() {
    let interner = ValueInterner::new(0);
    let a = interner.intern(&Term::typed_literal("1", "http://www.w3.org/2001/XMLSchema#integer"));
    let b = interner.intern(&Term::typed_literal("1", "http://www.w3.org/2001/XMLSchema#integer"));
    assert!(a.ptr_eq(&b));
    assert_eq!(a.id(), b.id());

    let plain = interner.intern(&Term::literal("1"));
    assert!(!a.ptr_eq(&plain));
}

#[test]
fn test_reclaimed_term_gets_new_handle() {
    let interner = ValueInterner::new(0);
    let term = Term::iri("http://ex/transient");
    let first_id = {
        let handle = interner.intern(&term);
        handle.id()
    };
    assert!(!interner.contains(&term));
    assert_eq!(interner.sweep(), 1);

    let second = interner.intern(&term);
    assert_ne!(second.id(), first_id);
    assert_eq!(second.reference_count(), 1);
}

#[test]
fn test_concurrent_interning_converges() {
    let interner = Arc::new(ValueInterner::new(64));
    let workers: Vec<_> = (0..8)
        .map(|_| {
            let interner = Arc::clone(&interner);
            thread::spawn(move || {
                (0..200)
                    .map(|n| interner.intern(&Term::iri(format!("http://ex/{}", n))))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let results: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    for handles in &results[1..] {
        for (mine, first) in handles.iter().zip(&results[0]) {
            assert!(mine.ptr_eq(first));
        }
    }
}

/// Terms used only by a purged statement leave the store's interner.
#[test]
fn test_store_reclaims_terms_after_clean() {
    let store = MemoryStore::new(StoreConfig {
        background_cleanup: false,
        ..StoreConfig::default()
    })
    .unwrap();
    let s = Term::blank_node("b0");
    let p = Term::iri("http://ex/p");
    let o = Term::lang_literal("hallo", "DE");

    let mut tx = store.begin().unwrap();
    tx.add(&s, &p, &o, None).unwrap();
    tx.commit().unwrap();
    let first_id = store.interner().lookup(&s).unwrap().id();

    let mut tx = store.begin().unwrap();
    tx.remove(&QuadPattern::any().with_subject(s.clone())).unwrap();
    tx.commit().unwrap();
    assert!(store.interner().contains(&s));

    store.clean_snapshots().unwrap();
    assert!(!store.interner().contains(&s));
    assert!(!store.interner().contains(&Term::lang_literal("hallo", "de")));

    let mut tx = store.begin().unwrap();
    tx.add(&s, &p, &o, None).unwrap();
    tx.commit().unwrap();
    assert_ne!(store.interner().lookup(&s).unwrap().id(), first_id);
}

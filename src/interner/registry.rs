//! Weak term registry
//!
//! The registry maps structural terms to weak references of their canonical
//! instance. It never keeps a term alive by itself: once the last
//! `TermHandle` is dropped the weak entry goes stale and is removed by the
//! next sweep. Sweeps run on access every `sweep_interval` interns and on
//! demand (the store sweeps after each clean pass).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::handle::{InternedTerm, TermHandle, TermId};
use crate::model::Term;

/// Concurrent canonicalizing registry for RDF terms.
#[derive(Debug)]
pub struct ValueInterner {
    registry: DashMap<Term, Weak<InternedTerm>>,
    next_id: AtomicU64,
    interns_since_sweep: AtomicU64,
    sweep_interval: u64,
}

impl ValueInterner {
    /// Create an interner that sweeps stale entries every `sweep_interval`
    /// interns. Zero disables on-access sweeping.
    pub fn new(sweep_interval: u64) -> Self {
        Self {
            registry: DashMap::new(),
            next_id: AtomicU64::new(1),
            interns_since_sweep: AtomicU64::new(0),
            sweep_interval,
        }
    }

    /// Return the canonical handle for `term`, creating it on first sight.
    pub fn intern(&self, term: &Term) -> TermHandle {
        if let Some(handle) = self.lookup(term) {
            return handle;
        }

        let handle = match self.registry.entry(term.clone()) {
            Entry::Occupied(mut entry) => match entry.get().upgrade() {
                Some(existing) => TermHandle(existing),
                None => {
                    let fresh = self.allocate(term);
                    entry.insert(Arc::downgrade(&fresh.0));
                    fresh
                }
            },
            Entry::Vacant(entry) => {
                let fresh = self.allocate(term);
                entry.insert(Arc::downgrade(&fresh.0));
                fresh
            }
        };

        // The shard guard is released above; sweeping takes every shard lock.
        self.maybe_sweep();
        handle
    }

    /// Return the canonical handle for `term` if it is currently interned.
    pub fn lookup(&self, term: &Term) -> Option<TermHandle> {
        self.registry
            .get(term)
            .and_then(|weak| weak.upgrade())
            .map(TermHandle)
    }

    /// True if `term` has a live canonical instance.
    pub fn contains(&self, term: &Term) -> bool {
        self.lookup(term).is_some()
    }

    /// Remove stale weak entries. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let before = self.registry.len();
        self.registry.retain(|_, weak| weak.strong_count() > 0);
        self.interns_since_sweep.store(0, Ordering::Relaxed);
        before.saturating_sub(self.registry.len())
    }

    /// Number of registry entries, including stale ones not yet swept.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Number of entries whose term is still referenced.
    pub fn live_count(&self) -> usize {
        self.registry
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }

    fn allocate(&self, term: &Term) -> TermHandle {
        let id = TermId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        TermHandle(Arc::new(InternedTerm {
            id,
            term: term.clone(),
        }))
    }

    fn maybe_sweep(&self) {
        if self.sweep_interval == 0 {
            return;
        }
        let count = self.interns_since_sweep.fetch_add(1, Ordering::Relaxed) + 1;
        if count >= self.sweep_interval {
            self.sweep();
        }
    }
}

impl Default for ValueInterner {
    fn default() -> Self {
        Self::new(4096)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_returns_same_handle() {
        let interner = ValueInterner::new(0);
        let a = interner.intern(&Term::iri("http://ex/a"));
        let b = interner.intern(&Term::iri("http://ex/a"));
        assert!(a.ptr_eq(&b));
        assert_eq!(a.id(), b.id());
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_distinct_terms_distinct_handles() {
        let interner = ValueInterner::new(0);
        let a = interner.intern(&Term::iri("http://ex/a"));
        let b = interner.intern(&Term::literal("http://ex/a"));
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_registry_does_not_keep_terms_alive() {
        let interner = ValueInterner::new(0);
        let term = Term::iri("http://ex/a");
        let first_id = interner.intern(&term).id();

        // Handle dropped: entry is stale.
        assert!(!interner.contains(&term));
        assert_eq!(interner.live_count(), 0);
        assert_eq!(interner.sweep(), 1);
        assert!(interner.is_empty());

        let again = interner.intern(&term);
        assert_ne!(again.id(), first_id);
    }

    #[test]
    fn test_stale_entry_replaced_without_sweep() {
        let interner = ValueInterner::new(0);
        let term = Term::blank_node("b1");
        let old = interner.intern(&term).id();
        let fresh = interner.intern(&term);
        assert_ne!(fresh.id(), old);
        assert!(interner.contains(&term));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_lookup_does_not_create() {
        let interner = ValueInterner::new(0);
        assert!(interner.lookup(&Term::iri("http://ex/missing")).is_none());
        assert!(interner.is_empty());
    }

    #[test]
    fn test_on_access_sweep() {
        let interner = ValueInterner::new(4);
        for i in 0..3 {
            let _ = interner.intern(&Term::literal(format!("v{}", i)));
        }
        assert_eq!(interner.len(), 3);
        let keep = interner.intern(&Term::literal("keep"));
        // Fourth intern triggers a sweep of the three dropped terms.
        assert_eq!(interner.len(), 1);
        assert!(interner.contains(keep.term()));
    }

    #[test]
    fn test_reference_count_tracks_handles() {
        let interner = ValueInterner::new(0);
        let a = interner.intern(&Term::iri("a"));
        assert_eq!(a.reference_count(), 1);
        let b = interner.intern(&Term::iri("a"));
        assert_eq!(a.reference_count(), 2);
        drop(b);
        assert_eq!(a.reference_count(), 1);
    }
}

//! Canonical term handles

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::model::Term;

/// Identity of an interned term within one store instance.
///
/// Ids are never reused: a term that is reclaimed and interned again gets a
/// fresh id. Zero is never assigned; indexes use it for the default graph.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TermId(u64);

impl TermId {
    /// The id indexes use for "no context".
    pub const DEFAULT_GRAPH: u64 = 0;

    #[inline]
    pub(crate) fn new(value: u64) -> Self {
        debug_assert!(value != Self::DEFAULT_GRAPH);
        Self(value)
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The canonical instance behind a handle.
#[derive(Debug)]
pub(crate) struct InternedTerm {
    pub(crate) id: TermId,
    pub(crate) term: Term,
}

/// A counted reference to a canonical term.
///
/// Holding a handle keeps the term alive in the interner. Equality is
/// identity: two handles are equal iff they point at the same canonical
/// instance, which for handles from one interner is equivalent to structural
/// equality of the terms.
#[derive(Clone)]
pub struct TermHandle(pub(crate) Arc<InternedTerm>);

impl TermHandle {
    #[inline]
    pub fn id(&self) -> TermId {
        self.0.id
    }

    #[inline]
    pub fn term(&self) -> &Term {
        &self.0.term
    }

    /// Number of live handles to this term, including this one.
    pub fn reference_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub fn ptr_eq(&self, other: &TermHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for TermHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for TermHandle {}

impl Hash for TermHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state)
    }
}

impl PartialOrd for TermHandle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TermHandle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.id.cmp(&other.0.id)
    }
}

impl fmt::Debug for TermHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TermHandle({} {})", self.0.id, self.0.term)
    }
}

impl fmt::Display for TermHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.term)
    }
}

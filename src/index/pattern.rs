//! Statement patterns
//!
//! `QuadPattern` is the caller-facing form: optional terms plus a context
//! filter. Before scanning it is resolved against the interner into one or
//! more `IdPattern`s. A bound term that is not interned cannot match any
//! stored statement, so resolution short-circuits to no scans at all.

use serde::{Deserialize, Serialize};

use crate::interner::{TermId, ValueInterner};
use crate::model::{Quad, Term};

/// Which graphs a pattern selects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextFilter {
    /// Every graph, default graph included.
    #[default]
    Any,
    /// Only the default graph.
    DefaultGraph,
    /// One named graph.
    Named(Term),
    /// Any of the listed graphs; `None` is the default graph.
    OneOf(Vec<Option<Term>>),
}

impl ContextFilter {
    pub fn matches(&self, context: Option<&Term>) -> bool {
        match self {
            ContextFilter::Any => true,
            ContextFilter::DefaultGraph => context.is_none(),
            ContextFilter::Named(term) => context == Some(term),
            ContextFilter::OneOf(list) => list.iter().any(|c| c.as_ref() == context),
        }
    }

    /// Context ids to scan. `None` means unrestricted, an empty list means
    /// nothing can match.
    fn resolve(&self, interner: &ValueInterner) -> Option<Vec<u64>> {
        match self {
            ContextFilter::Any => None,
            ContextFilter::DefaultGraph => Some(vec![TermId::DEFAULT_GRAPH]),
            ContextFilter::Named(term) => {
                Some(interner.lookup(term).map(|h| h.id().value()).into_iter().collect())
            }
            ContextFilter::OneOf(list) => {
                let mut ids: Vec<u64> = list
                    .iter()
                    .filter_map(|c| match c {
                        None => Some(TermId::DEFAULT_GRAPH),
                        Some(term) => interner.lookup(term).map(|h| h.id().value()),
                    })
                    .collect();
                ids.sort_unstable();
                ids.dedup();
                Some(ids)
            }
        }
    }
}

/// A statement pattern: unbound fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuadPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Term>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<Term>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Term>,
    #[serde(default)]
    pub context: ContextFilter,
    /// `Some(true)` explicit only, `Some(false)` inferred only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit: Option<bool>,
}

impl QuadPattern {
    /// The pattern matching every statement.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(
        subject: Option<Term>,
        predicate: Option<Term>,
        object: Option<Term>,
        context: ContextFilter,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
            context,
            explicit: None,
        }
    }

    /// The pattern matching exactly `quad`.
    pub fn exact(quad: &Quad) -> Self {
        let context = match &quad.context {
            Some(c) => ContextFilter::Named(c.clone()),
            None => ContextFilter::DefaultGraph,
        };
        Self::new(
            Some(quad.subject.clone()),
            Some(quad.predicate.clone()),
            Some(quad.object.clone()),
            context,
        )
    }

    pub fn with_subject(mut self, subject: Term) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_predicate(mut self, predicate: Term) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_object(mut self, object: Term) -> Self {
        self.object = Some(object);
        self
    }

    pub fn in_context(mut self, context: ContextFilter) -> Self {
        self.context = context;
        self
    }

    pub fn explicit_only(mut self) -> Self {
        self.explicit = Some(true);
        self
    }

    pub fn inferred_only(mut self) -> Self {
        self.explicit = Some(false);
        self
    }

    /// Structural match against an owned quad.
    pub fn matches(&self, quad: &Quad) -> bool {
        fn field(bound: &Option<Term>, value: &Term) -> bool {
            bound.as_ref().map_or(true, |b| b == value)
        }
        field(&self.subject, &quad.subject)
            && field(&self.predicate, &quad.predicate)
            && field(&self.object, &quad.object)
            && self.context.matches(quad.context.as_ref())
    }

    /// Resolve to id patterns, one per selected context. Empty if some
    /// bound term is unknown.
    pub fn resolve(&self, interner: &ValueInterner) -> Vec<IdPattern> {
        let lookup = |term: &Option<Term>| -> Option<Option<u64>> {
            match term {
                None => Some(None),
                Some(t) => interner.lookup(t).map(|h| Some(h.id().value())),
            }
        };

        let (Some(subject), Some(predicate), Some(object)) = (
            lookup(&self.subject),
            lookup(&self.predicate),
            lookup(&self.object),
        ) else {
            return Vec::new();
        };

        let base = IdPattern {
            subject,
            predicate,
            object,
            context: None,
            explicit: self.explicit,
        };

        match self.context.resolve(interner) {
            None => vec![base],
            Some(ids) => ids
                .into_iter()
                .map(|c| IdPattern {
                    context: Some(c),
                    ..base
                })
                .collect(),
        }
    }
}

/// A pattern over interned ids. `context: Some(0)` is the default graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdPattern {
    pub subject: Option<u64>,
    pub predicate: Option<u64>,
    pub object: Option<u64>,
    pub context: Option<u64>,
    pub explicit: Option<bool>,
}

impl IdPattern {
    /// Bound components in subject, predicate, object, context order.
    pub fn components(&self) -> [Option<u64>; 4] {
        [self.subject, self.predicate, self.object, self.context]
    }

    pub fn matches(&self, key: &[u64; 4], explicit: bool) -> bool {
        self.components()
            .iter()
            .zip(key.iter())
            .all(|(bound, value)| bound.map_or(true, |b| b == *value))
            && self.explicit.map_or(true, |e| e == explicit)
    }
}

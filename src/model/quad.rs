//! Owned quads as handed across the store boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Term;

/// A subject/predicate/object triple in an optional named graph.
///
/// `context == None` is the default graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Term>,
}

impl Quad {
    pub fn new(subject: Term, predicate: Term, object: Term, context: Option<Term>) -> Self {
        Self {
            subject,
            predicate,
            object,
            context,
        }
    }

    /// A quad in the default graph.
    pub fn triple(subject: Term, predicate: Term, object: Term) -> Self {
        Self::new(subject, predicate, object, None)
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(ctx) = &self.context {
            write!(f, " {}", ctx)?;
        }
        write!(f, " .")
    }
}

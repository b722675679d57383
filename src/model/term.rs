//! RDF terms
//!
//! A term is identified purely by its structural content. Two terms are the
//! same term iff they compare equal; the interner relies on this.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Datatype IRI of plain literals without a language tag.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Datatype IRI of language-tagged literals.
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// The kind of a term, used for role validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Iri,
    BlankNode,
    Literal,
    Triple,
}

impl TermKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermKind::Iri => "iri",
            TermKind::BlankNode => "blank_node",
            TermKind::Literal => "literal",
            TermKind::Triple => "triple",
        }
    }
}

/// An RDF term: IRI, blank node, literal or embedded triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    /// An absolute IRI, stored without angle brackets.
    Iri(String),
    /// A blank node label, stored without the `_:` prefix.
    BlankNode(String),
    /// A literal value.
    Literal(Literal),
    /// An embedded (quoted) triple.
    Triple(Box<Triple>),
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(value.into())
    }

    pub fn blank_node(label: impl Into<String>) -> Self {
        Term::BlankNode(label.into())
    }

    /// A plain `xsd:string` literal.
    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal(Literal::simple(lexical))
    }

    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Literal::typed(lexical, datatype))
    }

    pub fn lang_literal(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal(Literal::lang(lexical, language))
    }

    pub fn triple(subject: Term, predicate: Term, object: Term) -> Self {
        Term::Triple(Box::new(Triple::new(subject, predicate, object)))
    }

    pub fn kind(&self) -> TermKind {
        match self {
            Term::Iri(_) => TermKind::Iri,
            Term::BlankNode(_) => TermKind::BlankNode,
            Term::Literal(_) => TermKind::Literal,
            Term::Triple(_) => TermKind::Triple,
        }
    }

    /// True for terms allowed in subject position.
    pub fn is_resource(&self) -> bool {
        !matches!(self, Term::Literal(_))
    }

    /// True for terms allowed as a graph name.
    pub fn is_graph_name(&self) -> bool {
        matches!(self, Term::Iri(_) | Term::BlankNode(_))
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::BlankNode(label) => write!(f, "_:{}", label),
            Term::Literal(literal) => write!(f, "{}", literal),
            Term::Triple(triple) => write!(f, "<< {} >>", triple),
        }
    }
}

/// A literal with an optional datatype or language tag.
///
/// A language-tagged literal never carries an explicit datatype; a literal
/// with neither is an `xsd:string`.
///
/// Decoding goes through the same normalization as the constructors, so
/// every spelling of a literal deserializes to one term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "LiteralFields")]
pub struct Literal {
    lexical: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    datatype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

/// Wire shape of a literal before normalization.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LiteralFields {
    lexical: String,
    #[serde(default)]
    datatype: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

impl TryFrom<LiteralFields> for Literal {
    type Error = String;

    fn try_from(fields: LiteralFields) -> Result<Self, Self::Error> {
        match (fields.datatype, fields.language) {
            (None, None) => Ok(Literal::simple(fields.lexical)),
            (Some(datatype), None) => Ok(Literal::typed(fields.lexical, datatype)),
            (None, Some(language)) => Ok(Literal::lang(fields.lexical, language)),
            (Some(datatype), Some(language)) if datatype == RDF_LANG_STRING => {
                Ok(Literal::lang(fields.lexical, language))
            }
            (Some(_), Some(_)) => {
                Err("literal cannot have both a datatype and a language tag".to_string())
            }
        }
    }
}

impl Literal {
    pub fn simple(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    /// Typed literal. `xsd:string` is normalized to a simple literal so both
    /// spellings intern to one term.
    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        Self {
            lexical: lexical.into(),
            datatype: if datatype == XSD_STRING {
                None
            } else {
                Some(datatype)
            },
            language: None,
        }
    }

    /// Language tags are case-insensitive and stored lowercased.
    pub fn lang(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into().to_ascii_lowercase()),
        }
    }

    pub fn lexical(&self) -> &str {
        &self.lexical
    }

    /// The language tag, lowercased.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// The effective datatype IRI.
    pub fn datatype(&self) -> &str {
        match (&self.datatype, &self.language) {
            (_, Some(_)) => RDF_LANG_STRING,
            (Some(dt), None) => dt,
            (None, None) => XSD_STRING,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        for c in self.lexical.chars() {
            match c {
                '"' => write!(f, "\\\"")?,
                '\\' => write!(f, "\\\\")?,
                '\n' => write!(f, "\\n")?,
                '\r' => write!(f, "\\r")?,
                c => write!(f, "{}", c)?,
            }
        }
        write!(f, "\"")?;
        match (&self.language, &self.datatype) {
            (Some(lang), _) => write!(f, "@{}", lang),
            (None, Some(dt)) => write!(f, "^^<{}>", dt),
            (None, None) => Ok(()),
        }
    }
}

/// An embedded triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

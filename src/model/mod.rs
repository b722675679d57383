//! RDF data model
//!
//! Plain value types. Nothing here is shared or versioned; the store interns
//! these into canonical handles on the way in and clones them back out.

mod quad;
mod term;

pub use quad::Quad;
pub use term::{Literal, Term, TermKind, Triple, RDF_LANG_STRING, XSD_STRING};

//! Value interning
//!
//! Canonicalizes RDF terms so structurally equal terms share one instance.
//!
//! - `ValueInterner` - concurrent registry of weak references
//! - `TermHandle` - counted reference to a canonical term
//! - `TermId` - stable numeric identity used as an index key
//!
//! Reclamation is explicit reference counting: a term lives exactly as long
//! as some `TermHandle` to it exists. Stale registry entries are swept, never
//! resurrected.

mod handle;
mod registry;

pub use handle::{TermHandle, TermId};
pub use registry::ValueInterner;

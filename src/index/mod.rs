//! Pattern index subsystem
//!
//! Indexes are derived state over the statement collection: every stored
//! statement version appears in six sorted trees, one per permutation of
//! (subject, predicate, object, context). Together they answer any
//! combination of bound components with a single range scan.
//!
//! # Invariants
//!
//! - All trees share the same `Arc<VersionedStatement>` instances
//! - Insertion across trees is atomic to readers
//! - Indexes hold every version; visibility is decided by the reader
//! - Purged versions are removed in batches by the clean pass

mod btree;
mod manager;
mod pattern;

pub use btree::{IndexKey, IndexOrder, IndexTree};
pub use manager::{PatternIndexes, ScanBatch};
pub use pattern::{ContextFilter, IdPattern, QuadPattern};

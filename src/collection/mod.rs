//! Statement collection
//!
//! `StatementList` is a segmented slot arena of versioned statements.
//! Segments double in size and are never moved, so growth does not disturb
//! concurrent readers. Removal only stamps `till`; physical deletion happens
//! in `clean_snapshots` or, for rolled-back adds, in `purge`.

mod list;
mod segment;

pub use list::{StatementHandle, StatementIter, StatementList};

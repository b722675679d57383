//! aerordf - An in-memory, multi-version RDF quad store
//!
//! Readers never block: every read runs against a snapshot and sees exactly
//! the statement versions with `since <= snapshot < till`. One writer at a
//! time stamps its changes with the next snapshot and publishes them with a
//! single atomic commit.

pub mod cli;
pub mod collection;
pub mod config;
pub mod index;
pub mod interner;
pub mod model;
pub mod mvcc;
pub mod observability;
pub mod store;
pub mod txn;

pub use config::StoreConfig;
pub use index::{ContextFilter, QuadPattern};
pub use model::{Literal, Quad, Term, Triple};
pub use mvcc::Snapshot;
pub use store::{MemoryStore, StoreError, StoreResult, Transaction};
pub use txn::IsolationLevel;

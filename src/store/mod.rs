//! Store and transactions
//!
//! - `MemoryStore` - one store instance and its shared state
//! - `Transaction` - isolated reads, lazily-acquired writes
//! - `StatementCursor` - lazy, cancellable pattern scan
//! - background cleaner and namespace map (internal)
//! - `StoreError` - error codes of the whole subsystem

mod cleaner;
mod cursor;
mod errors;
mod memory_store;
mod namespaces;
mod transaction;

pub use cursor::{CursorCancel, StatementCursor};
pub use errors::{StoreError, StoreResult};
pub use memory_store::{CleanReport, MemoryStore, StoreStats};
pub use transaction::{InterruptHandle, Transaction};

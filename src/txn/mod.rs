//! Transaction coordination
//!
//! - `IsolationLevel` - what a transaction observes
//! - `SnapshotCounter` - the commit counter
//! - `WriterGate` - single-writer exclusion
//! - `SnapshotCoordinator` - per-store owner of all three plus the
//!   snapshot monitor
//!
//! Readers never block: they only load the counter and take a reservation.
//! Writers serialize on the gate, acquired lazily on the first write.

mod coordinator;
mod counter;
mod gate;
mod isolation;

pub use coordinator::SnapshotCoordinator;
pub use counter::SnapshotCounter;
pub use gate::WriterGate;
pub use isolation::IsolationLevel;

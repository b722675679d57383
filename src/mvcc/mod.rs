//! MVCC Domain Types
//!
//! Defines the versioning vocabulary of the store:
//! - `Snapshot` - Totally ordered version number
//! - `ReadView` - Stable snapshot boundary, optionally with own writes
//! - `Visibility` - The visibility rule
//! - `VersionedStatement` - A stored quad with its `[since, till)` interval
//! - `SnapshotMonitor` - Reserved snapshots and the clean floor

mod monitor;
mod read_view;
mod snapshot;
mod versioned;
mod visibility;

pub use monitor::{SnapshotMonitor, SnapshotReservation};
pub use read_view::ReadView;
pub use snapshot::Snapshot;
pub use versioned::{LifecycleState, VersionedStatement};
pub use visibility::Visibility;

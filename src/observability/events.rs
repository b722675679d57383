//! Observable store events
//!
//! Events are explicit and typed. Every log line the store emits names one
//! of these.

use std::fmt;

/// Observable events of a store instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Store constructed
    StoreOpen,
    /// Store closed
    StoreClose,
    /// Configuration loaded from a file
    ConfigLoaded,

    // Transactions
    /// Transaction opened
    TxBegin,
    /// Transaction committed, snapshot advanced
    TxCommit,
    /// Transaction rolled back
    TxRollback,
    /// Serializable validation failed
    TxConflict,
    /// Blocked operation interrupted
    TxInterrupted,

    // Cleanup
    /// Background clean requested
    CleanScheduled,
    /// Clean pass finished
    CleanComplete,
    /// Stale interner entries removed
    InternerSweep,
    /// Background cleaner thread started
    CleanerStart,
    /// Background cleaner thread stopped
    CleanerStop,

    // Faults
    /// Internal invariant violated (FATAL)
    StoreFault,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreOpen => "STORE_OPEN",
            Event::StoreClose => "STORE_CLOSE",
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::TxBegin => "TX_BEGIN",
            Event::TxCommit => "TX_COMMIT",
            Event::TxRollback => "TX_ROLLBACK",
            Event::TxConflict => "TX_CONFLICT",
            Event::TxInterrupted => "TX_INTERRUPTED",

            Event::CleanScheduled => "CLEAN_SCHEDULED",
            Event::CleanComplete => "CLEAN_COMPLETE",
            Event::InternerSweep => "INTERNER_SWEEP",
            Event::CleanerStart => "CLEANER_START",
            Event::CleanerStop => "CLEANER_STOP",

            Event::StoreFault => "STORE_FAULT",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::StoreFault)
    }

    /// Per-transaction events are TRACE so a bulk load does not flood the log.
    pub fn is_verbose(&self) -> bool {
        matches!(self, Event::TxBegin | Event::TxCommit | Event::TxRollback)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::StoreOpen,
            Event::StoreClose,
            Event::ConfigLoaded,
            Event::TxBegin,
            Event::TxCommit,
            Event::TxRollback,
            Event::TxConflict,
            Event::TxInterrupted,
            Event::CleanScheduled,
            Event::CleanComplete,
            Event::InternerSweep,
            Event::CleanerStart,
            Event::CleanerStop,
            Event::StoreFault,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::StoreFault.is_fatal());
        assert!(!Event::TxConflict.is_fatal());
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::CleanComplete), "CLEAN_COMPLETE");
    }
}

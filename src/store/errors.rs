//! # Store Errors
//!
//! Error codes:
//! - AERO_STORE_FAULT (FATAL)
//! - AERO_OPERATION_INTERRUPTED (WARN, retryable)
//! - AERO_TRANSACTION_CONFLICT (WARN, retry from scratch)
//! - AERO_CAPACITY_EXHAUSTED (ERROR)
//! - AERO_INVALID_STATEMENT (ERROR)
//! - AERO_CONFIG_INVALID (ERROR)
//! - AERO_STORE_CLOSED (ERROR)

use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Severity};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the store and its transactions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An internal invariant was violated. The store must not be trusted.
    #[error("store fault: {0}")]
    StoreFault(String),

    /// A blocked operation was interrupted. Partial work was unwound.
    #[error("operation interrupted: {0}")]
    Interrupted(String),

    /// Serializable validation failed. Retry the transaction from scratch.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// Growth allocation failed or the statement limit was reached.
    #[error("capacity exhausted: {0}")]
    Capacity(String),

    /// A term was used in a position it cannot occupy.
    #[error("invalid statement: {0}")]
    InvalidStatement(String),

    /// Configuration rejected.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Operation on a closed store or finished transaction.
    #[error("store closed: {0}")]
    StoreClosed(String),
}

impl StoreError {
    /// Build a store fault and log it at FATAL.
    pub fn fault(message: impl Into<String>) -> Self {
        let message = message.into();
        log_event_with_fields(Event::StoreFault, &[("reason", message.as_str())]);
        StoreError::StoreFault(message)
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::StoreFault(_) => "AERO_STORE_FAULT",
            StoreError::Interrupted(_) => "AERO_OPERATION_INTERRUPTED",
            StoreError::Conflict(_) => "AERO_TRANSACTION_CONFLICT",
            StoreError::Capacity(_) => "AERO_CAPACITY_EXHAUSTED",
            StoreError::InvalidStatement(_) => "AERO_INVALID_STATEMENT",
            StoreError::Config(_) => "AERO_CONFIG_INVALID",
            StoreError::StoreClosed(_) => "AERO_STORE_CLOSED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            StoreError::StoreFault(_) => Severity::Fatal,
            StoreError::Interrupted(_) | StoreError::Conflict(_) => Severity::Warn,
            _ => Severity::Error,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::StoreFault(_))
    }

    /// True if retrying (the operation, or for conflicts the whole
    /// transaction) may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Interrupted(_) | StoreError::Conflict(_))
    }
}

//! CLI-specific error types
//!
//! Request errors are reported on stdout and the session continues. I/O
//! errors on stdin/stdout end the session.

use std::fmt;
use std::io;

use crate::store::StoreError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Malformed request line
    BadRequest,
    /// Request names a transaction that is not open
    UnknownTransaction,
    /// Error raised by the store, carrying its `AERO_*` code
    Store(&'static str),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "AERO_CLI_CONFIG_ERROR",
            Self::IoError => "AERO_CLI_IO_ERROR",
            Self::BadRequest => "AERO_CLI_BAD_REQUEST",
            Self::UnknownTransaction => "AERO_CLI_UNKNOWN_TRANSACTION",
            Self::Store(code) => code,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BadRequest, msg)
    }

    pub fn unknown_transaction(tx: u64) -> Self {
        Self::new(
            CliErrorCode::UnknownTransaction,
            format!("transaction {} is not open", tx),
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// True if the serving loop cannot continue after this error.
    pub fn ends_session(&self) -> bool {
        matches!(self.code, CliErrorCode::IoError | CliErrorCode::Store("AERO_STORE_FAULT"))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Self::io_error(e.to_string())
        } else {
            Self::bad_request(format!("JSON error: {}", e))
        }
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        let code = match &e {
            StoreError::Config(_) => CliErrorCode::ConfigError,
            other => CliErrorCode::Store(other.code()),
        };
        Self::new(code, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

//! Store configuration
//!
//! JSON file with a default for every field. Unknown fields are rejected so
//! that a misspelled key fails loudly instead of silently using a default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event, Severity};
use crate::store::{StoreError, StoreResult};
use crate::txn::IsolationLevel;

/// Construction-time configuration of a `MemoryStore`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Slots in the first arena segment
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,

    /// Hard cap on occupied slots (optional, unlimited by default)
    #[serde(default)]
    pub max_statements: Option<usize>,

    /// Minimum occupied slots before a commit schedules a background clean
    #[serde(default = "default_cleanup_threshold")]
    pub cleanup_threshold: usize,

    /// Run the background cleaner thread
    #[serde(default = "default_true")]
    pub background_cleanup: bool,

    /// Delay between a clean request and the pass
    #[serde(default = "default_cleanup_delay_ms")]
    pub cleanup_delay_ms: u64,

    /// Max wait for write access before `Interrupted`
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Interns between on-access interner sweeps (0 = never)
    #[serde(default = "default_interner_sweep_interval")]
    pub interner_sweep_interval: u64,

    /// Index entries fetched per cursor refill
    #[serde(default = "default_iterator_batch_size")]
    pub iterator_batch_size: usize,

    /// Isolation level of `MemoryStore::begin`
    #[serde(default)]
    pub default_isolation: IsolationLevel,

    /// Minimum logger severity
    #[serde(default = "default_log_level")]
    pub log_level: Severity,
}

fn default_initial_capacity() -> usize {
    256
}
fn default_cleanup_threshold() -> usize {
    1000
}
fn default_true() -> bool {
    true
}
fn default_cleanup_delay_ms() -> u64 {
    5000
}
fn default_lock_timeout_ms() -> u64 {
    30_000
}
fn default_interner_sweep_interval() -> u64 {
    4096
}
fn default_iterator_batch_size() -> usize {
    512
}
fn default_log_level() -> Severity {
    Severity::Info
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
            max_statements: None,
            cleanup_threshold: default_cleanup_threshold(),
            background_cleanup: true,
            cleanup_delay_ms: default_cleanup_delay_ms(),
            lock_timeout_ms: default_lock_timeout_ms(),
            interner_sweep_interval: default_interner_sweep_interval(),
            iterator_batch_size: default_iterator_batch_size(),
            default_isolation: IsolationLevel::default(),
            log_level: default_log_level(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_json_str(&content)?;
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("path", &path.display().to_string())],
        );
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(content: &str) -> StoreResult<Self> {
        let config: StoreConfig = serde_json::from_str(content)
            .map_err(|e| StoreError::Config(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.initial_capacity == 0 {
            return Err(StoreError::Config("initial_capacity must be > 0".into()));
        }
        if self.iterator_batch_size == 0 {
            return Err(StoreError::Config("iterator_batch_size must be > 0".into()));
        }
        if self.lock_timeout_ms == 0 {
            return Err(StoreError::Config("lock_timeout_ms must be > 0".into()));
        }
        if self.max_statements == Some(0) {
            return Err(StoreError::Config("max_statements must be > 0 when set".into()));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_delay_ms)
    }
}

//! ObservationScope for automatic begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` with `elapsed_us` when completed
//! - Logs `{name}_INCOMPLETE` on drop if never completed

use std::cell::Cell;
use std::time::Instant;

use super::logger::{Logger, Severity};

/// A scope that logs begin and complete events around a unit of work.
///
/// ```ignore
/// let scope = ObservationScope::new("CLEAN");
/// // ... do work ...
/// scope.complete_with_fields(&[("purged", "12")]);
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    severity: Severity,
    started: Instant,
    completed: Cell<bool>,
}

impl<'a> ObservationScope<'a> {
    pub fn new(name: &'a str) -> Self {
        Self::with_severity(name, Severity::Info)
    }

    /// Create a scope that logs at the given severity.
    pub fn with_severity(name: &'a str, severity: Severity) -> Self {
        Logger::log(severity, &format!("{}_BEGIN", name), &[]);
        Self {
            name,
            severity,
            started: Instant::now(),
            completed: Cell::new(false),
        }
    }

    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope as completed, logging the extra fields.
    pub fn complete_with_fields(self, fields: &[(&str, &str)]) {
        self.completed.set(true);
        let elapsed = self.elapsed_us().to_string();
        let mut all: Vec<(&str, &str)> = Vec::with_capacity(fields.len() + 1);
        all.push(("elapsed_us", elapsed.as_str()));
        all.extend(fields.iter().copied());
        Logger::log(self.severity, &format!("{}_COMPLETE", self.name), &all);
    }

    /// Mark the scope as failed with a reason
    pub fn fail(self, reason: &str) {
        self.completed.set(true);
        Logger::error(&format!("{}_FAILED", self.name), &[("reason", reason)]);
    }

    pub fn elapsed_us(&self) -> u128 {
        self.started.elapsed().as_micros()
    }

    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            Logger::warn(
                &format!("{}_INCOMPLETE", self.name),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_creation() {
        let scope = ObservationScope::new("TEST");
        assert!(!scope.is_completed());
        scope.complete();
    }

    #[test]
    fn test_scope_complete_with_fields() {
        let scope = ObservationScope::with_severity("TEST", Severity::Trace);
        scope.complete_with_fields(&[("purged", "3")]);
    }

    #[test]
    fn test_scope_fail() {
        let scope = ObservationScope::new("TEST");
        scope.fail("something went wrong");
    }

    #[test]
    fn test_scope_drop_without_complete() {
        let scope = ObservationScope::new("TEST");
        drop(scope);
    }

    #[test]
    fn test_elapsed_increases() {
        let scope = ObservationScope::new("TEST");
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(scope.elapsed_us() >= 2000);
        scope.complete();
    }
}

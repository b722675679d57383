//! Observability subsystem
//!
//! - Structured logging (JSON lines on stderr)
//! - Lock-free counters
//! - Lifecycle event tracing
//!
//! Observability is read-only: it never changes the outcome of a store
//! operation, and a failed log write is ignored.
//!
//! ```ignore
//! use aerordf::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::TxCommit, &[("snapshot", "12")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

fn severity_of(event: Event) -> Severity {
    if event.is_fatal() {
        Severity::Fatal
    } else if event.is_verbose() {
        Severity::Trace
    } else {
        Severity::Info
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(severity_of(event), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_of(event), event.as_str(), fields);
}

/// Log an event at an explicit severity
pub fn log_event_at(severity: Severity, event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity, event.as_str(), fields);
}

//! Structured logging for the clock-in runner.
//!
//! Console and rolling NDJSON file output, typed attendance events, and
//! scrubbing of credentials before anything reaches a log line.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{AttendanceEvent, AttendanceEventLogger, EventLogEntry};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;

//! Attendance Event Logger
//!
//! Typed run events (readiness, per-day outcome, run result) emitted through
//! `tracing` under the `attendance_events` target, so they land in the NDJSON
//! log alongside everything else.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttendanceEvent {
    ReadinessResolved {
        signal: String,
    },
    DaySubmitted {
        date: String,
        day: u32,
        clock_in: String,
        clock_out: String,
        dry_run: bool,
    },
    DaySkipped {
        date: String,
        reason: String,
    },
    RunFinished {
        submitted: usize,
        skipped: usize,
    },
    RunFailed {
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: AttendanceEvent,
}

impl EventLogEntry {
    pub fn new(run_id: &str, mut event: AttendanceEvent) -> Self {
        match &mut event {
            AttendanceEvent::DaySkipped { reason, .. } => {
                *reason = redact_sensitive_data(reason);
            }
            AttendanceEvent::RunFailed { error_msg } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            _ => {}
        }
        Self {
            run_id: run_id.into(),
            timestamp: Utc::now(),
            event,
        }
    }
}

pub struct AttendanceEventLogger;

impl AttendanceEventLogger {
    pub fn log_event(run_id: &str, event: AttendanceEvent) {
        let entry = EventLogEntry::new(run_id, event);
        let payload = serde_json::to_string(&entry).unwrap_or_else(|_| format!("{entry:?}"));
        match entry.event {
            AttendanceEvent::RunFailed { .. } => {
                warn!(target: "attendance_events", event = %payload, "Attendance event")
            }
            _ => info!(target: "attendance_events", event = %payload, "Attendance event"),
        }
    }
}

//! Scan observer that prints progress lines and mirrors each outcome into the
//! attendance event log.

use clockin_core::{DayOutcome, DayResult, ReadinessSignal, ScanObserver, SubmissionOutcome};
use clockin_logging::{AttendanceEvent, AttendanceEventLogger};

use crate::terminal_output::{day_line, note_status, supports_color};

pub struct TerminalProgress {
    run_id: String,
    quiet: bool,
    color: bool,
}

impl TerminalProgress {
    /// `quiet` suppresses terminal lines (used with `--json`); events are
    /// still logged.
    pub fn new(run_id: impl Into<String>, quiet: bool) -> Self {
        Self {
            run_id: run_id.into(),
            quiet,
            color: supports_color(),
        }
    }
}

impl ScanObserver for TerminalProgress {
    fn status(&self, message: &str) {
        if !self.quiet {
            note_status(message);
        }
    }

    fn readiness_resolved(&self, signal: ReadinessSignal) {
        AttendanceEventLogger::log_event(
            &self.run_id,
            AttendanceEvent::ReadinessResolved {
                signal: signal.to_string(),
            },
        );
    }

    fn day_outcome(&self, outcome: &DayOutcome) {
        if !self.quiet {
            println!("{}", day_line(outcome, self.color));
        }
        AttendanceEventLogger::log_event(&self.run_id, day_event(outcome));
    }
}

fn day_event(outcome: &DayOutcome) -> AttendanceEvent {
    match &outcome.result {
        DayResult::Submitted {
            clock_in,
            clock_out,
            outcome: sent,
        } => AttendanceEvent::DaySubmitted {
            date: outcome.label.clone(),
            day: outcome.day.unwrap_or_default(),
            clock_in: clock_in.to_string(),
            clock_out: clock_out.to_string(),
            dry_run: *sent == SubmissionOutcome::DryRunSkipped,
        },
        DayResult::Skipped { reason } => AttendanceEvent::DaySkipped {
            date: outcome.label.clone(),
            reason: reason.to_string(),
        },
    }
}

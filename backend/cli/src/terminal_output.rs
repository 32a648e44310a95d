//! Terminal output: ANSI notes and the per-day progress lines.

use clockin_core::{DayOutcome, DayResult, SkipReason, SubmissionOutcome};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

/// Print a dimmed status line (spinner replacement).
pub fn note_status(msg: &str) {
    if supports_color() {
        println!("{DIM}{msg}{RESET}");
    } else {
        println!("{msg}");
    }
}

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        eprintln!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        eprintln!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

/// One line per table row: `05 March... ✅ 10:00 - 18:00` or
/// `06 March... ❌ Sunday`.
pub fn day_line(outcome: &DayOutcome, color: bool) -> String {
    let (mark, tint, detail) = match &outcome.result {
        DayResult::Submitted {
            clock_in,
            clock_out,
            outcome: sent,
        } => {
            let mut detail = format!("{clock_in} - {clock_out}");
            if *sent == SubmissionOutcome::DryRunSkipped {
                detail.push_str(" (dry run)");
            }
            ("✅", GREEN, detail)
        }
        DayResult::Skipped { reason } => {
            let detail = match (reason, &outcome.week_day) {
                (SkipReason::Weekend, Some(week_day)) => week_day.clone(),
                _ => reason.to_string(),
            };
            ("❌", RED, detail)
        }
    };
    if color {
        format!("{}... {tint}{mark}{RESET} {detail}", outcome.label)
    } else {
        format!("{}... {mark} {detail}", outcome.label)
    }
}

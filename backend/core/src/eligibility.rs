//! Day Eligibility Evaluator
//!
//! Decides, for one row of the attendance table, whether a shift should be
//! submitted or why the day is skipped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RowParseError;

/// Weekend day names exactly as the attendance UI renders them, across the
/// locales it ships (en, es, ca, nl, it, sv, de, fr).
pub const WEEKEND_DAYS: &[&str] = &[
    "Saturday",
    "Sunday",
    "sábado",
    "domingo",
    "dissabte",
    "diumenge",
    "zaterdag",
    "zondag",
    "sabato",
    "domenica",
    "lördag",
    "söndag",
    "Samstag",
    "Sonntag",
    "samedi",
    "dimanche",
    "Sábado",
    "Domingo",
];

/// Hours cell value for a day with nothing logged.
pub const UNWORKED_HOURS: &str = "0h";

/// Text extracted from one day row of the attendance table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRow {
    pub week_day: String,
    /// `"<day> <month name>"`, e.g. `"5 March"`.
    pub month_day: String,
    pub hours_logged: String,
    pub leave_label: Option<String>,
}

impl DayRow {
    pub fn day_of_month(&self) -> Result<u32, String> {
        let (day, _) = self.split_month_day()?;
        let day: u32 = day
            .parse()
            .map_err(|_| format!("day '{day}' is not a number"))?;
        if !(1..=31).contains(&day) {
            return Err(format!("day {day} is out of range"));
        }
        Ok(day)
    }

    /// Zero-padded label used in outcome lines, e.g. `"05 March"`.
    pub fn display_date(&self) -> String {
        match self.split_month_day() {
            Ok((day, month)) => format!("{day:0>2} {month}"),
            Err(_) => self.month_day.clone(),
        }
    }

    fn split_month_day(&self) -> Result<(&str, &str), String> {
        let mut parts = self.month_day.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(day), Some(month), None) => Ok((day, month)),
            _ => Err(format!("unexpected date text '{}'", self.month_day)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    Leave(String),
    Weekend,
    AlreadyClocked,
    ParseError(String),
}

impl SkipReason {
    pub fn parse_error(err: &RowParseError) -> Self {
        Self::ParseError(err.message.clone())
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leave(label) => write!(f, "{label}"),
            Self::Weekend => write!(f, "Weekend"),
            Self::AlreadyClocked => write!(f, "Already clocked in"),
            Self::ParseError(msg) => write!(f, "Unreadable row ({msg})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayClassification {
    Eligible,
    Skip(SkipReason),
}

/// Classify a day row. Leave wins over weekend, which wins over logged hours.
pub fn classify(row: &DayRow) -> DayClassification {
    if let Some(label) = row.leave_label.as_deref().filter(|l| !l.is_empty()) {
        return DayClassification::Skip(SkipReason::Leave(label.to_string()));
    }
    if WEEKEND_DAYS.contains(&row.week_day.as_str()) {
        return DayClassification::Skip(SkipReason::Weekend);
    }
    if row.hours_logged != UNWORKED_HOURS {
        return DayClassification::Skip(SkipReason::AlreadyClocked);
    }
    DayClassification::Eligible
}

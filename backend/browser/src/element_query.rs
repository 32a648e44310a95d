//! Element Queries
//!
//! Reads text out of the rendered attendance page with CSS selectors.

use anyhow::{Context, Result};
use serde::Deserialize;

use clockin_core::{DayRow, RowParseError};

use crate::page_control::{js_string, PageControl};

/// Cells of one attendance table row.
pub mod selectors {
    pub const LEAVE: &str = "td:first-child>div>div:nth-child(3)";
    pub const HOURS: &str = "td:nth-child(4)";
    pub const MONTH_DAY: &str = r#"div[class*="monthDay"]"#;
    pub const WEEK_DAY: &str = r#"div[class*="weekDay"]"#;
    pub const LOGIN_ERROR: &str = ".flash--wrong";
}

/// Trimmed `textContent` pulled from a `tr`; `None` where the selector
/// matched nothing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRow {
    week_day: Option<String>,
    month_day: Option<String>,
    hours: Option<String>,
    leave: Option<String>,
}

impl RawRow {
    fn into_day_row(self, index: usize) -> Result<DayRow, RowParseError> {
        let missing: Vec<&str> = [
            ("weekday", self.week_day.is_none()),
            ("date", self.month_day.is_none()),
            ("hours", self.hours.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        match (self.week_day, self.month_day, self.hours) {
            (Some(week_day), Some(month_day), Some(hours_logged)) => Ok(DayRow {
                week_day,
                month_day,
                hours_logged,
                leave_label: self.leave,
            }),
            _ => Err(RowParseError::new(
                index,
                format!("missing {} cell", missing.join(", ")),
            )),
        }
    }
}

pub struct ElementQuery<'a> {
    page: &'a PageControl,
}

impl<'a> ElementQuery<'a> {
    pub fn new(page: &'a PageControl) -> Self {
        Self { page }
    }

    /// `textContent` of the first match, if any.
    pub async fn text_of(&self, selector: &str) -> Result<Option<String>> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.textContent : null; }})()",
            js_string(selector)
        );
        let value = self.page.evaluate(&script).await?;
        Ok(value.as_str().map(str::to_string))
    }

    /// Every `tr` on the page, in document order.
    pub async fn extract_day_rows(&self) -> Result<Vec<Result<DayRow, RowParseError>>> {
        let value = self.page.evaluate(&day_rows_script()).await?;
        let raw: Vec<RawRow> =
            serde_json::from_value(value).context("Unexpected shape from row extraction")?;
        Ok(raw
            .into_iter()
            .enumerate()
            .map(|(index, row)| row.into_day_row(index))
            .collect())
    }
}

fn day_rows_script() -> String {
    format!(
        r#"(() => {{
  const text = (row, sel) => {{ const el = row.querySelector(sel); return el ? el.textContent.trim() : null; }};
  return Array.from(document.querySelectorAll('tr')).map((row) => ({{
    weekDay: text(row, {week_day}),
    monthDay: text(row, {month_day}),
    hours: text(row, {hours}),
    leave: text(row, {leave}),
  }}));
}})()"#,
        week_day = js_string(selectors::WEEK_DAY),
        month_day = js_string(selectors::MONTH_DAY),
        hours = js_string(selectors::HOURS),
        leave = js_string(selectors::LEAVE),
    )
}

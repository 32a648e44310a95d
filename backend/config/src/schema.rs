//! Clock-in runner configuration schema.
//!
//! Every field is optional so a partial file (or none at all) is valid;
//! defaults are filled in by `defaults::apply_all_defaults`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockInConfig {
    /// Account e-mail; prompted for when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Shift start, `HH:MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_in: Option<String>,

    /// Shift end, `HH:MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_out: Option<String>,

    /// Deadline for each readiness signal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_timeout_secs: Option<u64>,

    /// Deadline for the attendance view's network to go idle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Browser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
    /// Path to a Chrome/Chromium binary; searched for when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headless: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debugging_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_timeout_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `clockin_browser=debug`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for rolling NDJSON logs; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

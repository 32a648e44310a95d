//! Config validation: checks with user-friendly, path-tagged messages.

use crate::schema::ClockInConfig;
use clockin_core::ClockTime;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &ClockInConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_email(config, &mut report);
    validate_shift(config, &mut report);
    validate_timeouts(config, &mut report);
    validate_browser(config, &mut report);
    report
}

fn validate_email(config: &ClockInConfig, report: &mut ValidationReport) {
    let Some(email) = &config.email else { return };
    if !email.contains('@') {
        report.warn("email", format!("'{email}' does not look like an e-mail address"));
    }
}

fn parse_time(value: Option<&str>, path: &str, report: &mut ValidationReport) -> Option<ClockTime> {
    let raw = value?;
    match raw.parse::<ClockTime>() {
        Ok(time) => Some(time),
        Err(e) => {
            report.error(path, e.to_string());
            None
        }
    }
}

fn validate_shift(config: &ClockInConfig, report: &mut ValidationReport) {
    let clock_in = parse_time(config.clock_in.as_deref(), "clockIn", report);
    let clock_out = parse_time(config.clock_out.as_deref(), "clockOut", report);
    if let (Some(start), Some(end)) = (clock_in, clock_out) {
        if end <= start {
            report.warn("clockOut", format!("Shift ends at {end}, not after it starts at {start}"));
        }
    }
}

fn validate_timeouts(config: &ClockInConfig, report: &mut ValidationReport) {
    if config.readiness_timeout_secs == Some(0) {
        report.error("readinessTimeoutSecs", "must be > 0");
    }
    if config.idle_timeout_secs == Some(0) {
        report.error("idleTimeoutSecs", "must be > 0");
    }
}

fn validate_browser(config: &ClockInConfig, report: &mut ValidationReport) {
    let Some(browser) = &config.browser else { return };
    if browser.debugging_port == Some(0) {
        report.error("browser.debuggingPort", "must be a real port, not 0");
    }
    if browser.launch_timeout_secs == Some(0) {
        report.error("browser.launchTimeoutSecs", "must be > 0");
    }
    if let Some(path) = &browser.executable {
        if path.trim().is_empty() {
            report.error("browser.executable", "cannot be empty; omit it to auto-detect");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults;
    use crate::schema::BrowserConfig;

    #[test]
    fn defaults_are_valid() {
        let report = validate(&apply_all_defaults(ClockInConfig::default()));
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn rejects_bad_clock_time() {
        let cfg = ClockInConfig {
            clock_in: Some("25:00".into()),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "clockIn");
    }

    #[test]
    fn warns_on_inverted_shift() {
        let cfg = ClockInConfig {
            clock_in: Some("18:00".into()),
            clock_out: Some("09:00".into()),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn rejects_zero_timeouts_and_port() {
        let cfg = ClockInConfig {
            readiness_timeout_secs: Some(0),
            browser: Some(BrowserConfig {
                debugging_port: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        let paths: Vec<&str> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["readinessTimeoutSecs", "browser.debuggingPort"]);
    }
}

//! Config defaults: fills every unset field with its built-in value.

use crate::schema::{BrowserConfig, ClockInConfig, LoggingConfig};
use clockin_core::ClockTime;

/// Default wait for each readiness signal (seconds).
pub const DEFAULT_READINESS_TIMEOUT_SECS: u64 = 120;

/// Default wait for the attendance view to go network-idle (seconds).
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_DEBUGGING_PORT: u16 = 9222;
pub const DEFAULT_LAUNCH_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: ClockInConfig) -> ClockInConfig {
    let config = apply_shift_defaults(config);
    let config = apply_timeout_defaults(config);
    let config = apply_browser_defaults(config);
    apply_logging_defaults(config)
}

fn apply_shift_defaults(mut config: ClockInConfig) -> ClockInConfig {
    config.clock_in.get_or_insert_with(|| ClockTime::DEFAULT_CLOCK_IN.to_string());
    config.clock_out.get_or_insert_with(|| ClockTime::DEFAULT_CLOCK_OUT.to_string());
    config
}

fn apply_timeout_defaults(mut config: ClockInConfig) -> ClockInConfig {
    config.readiness_timeout_secs.get_or_insert(DEFAULT_READINESS_TIMEOUT_SECS);
    config.idle_timeout_secs.get_or_insert(DEFAULT_IDLE_TIMEOUT_SECS);
    config
}

fn apply_browser_defaults(mut config: ClockInConfig) -> ClockInConfig {
    let browser = config.browser.get_or_insert_with(BrowserConfig::default);
    browser.headless.get_or_insert(false);
    browser.debugging_port.get_or_insert(DEFAULT_DEBUGGING_PORT);
    browser.launch_timeout_secs.get_or_insert(DEFAULT_LAUNCH_TIMEOUT_SECS);
    config
}

fn apply_logging_defaults(mut config: ClockInConfig) -> ClockInConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}

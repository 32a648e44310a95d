//! Merges command-line flags over the config file (which already carries
//! defaults) into the settings a run needs.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clockin_browser::LaunchOptions;
use clockin_config::{defaults, ClockInConfig};
use clockin_core::{ClockTime, ScanSettings, TargetMonth};

use crate::Cli;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub email: Option<String>,
    pub scan: ScanSettings,
    pub launch: LaunchOptions,
    pub json: bool,
}

impl RunOptions {
    pub fn resolve(cli: &Cli, config: &ClockInConfig) -> Result<Self> {
        let target = match (cli.year, cli.month) {
            (Some(year), Some(month)) => match TargetMonth::new(year, month) {
                Some(target) => target,
                None => bail!("{year}-{month} is not a valid month"),
            },
            (None, None) => TargetMonth::current(),
            _ => bail!("--year and --month must be given together"),
        };

        let clock_in = match cli.clock_in {
            Some(time) => time,
            None => config_time(config.clock_in.as_deref(), ClockTime::DEFAULT_CLOCK_IN)
                .context("Invalid clockIn in config")?,
        };
        let clock_out = match cli.clock_out {
            Some(time) => time,
            None => config_time(config.clock_out.as_deref(), ClockTime::DEFAULT_CLOCK_OUT)
                .context("Invalid clockOut in config")?,
        };

        let readiness_secs = cli
            .readiness_timeout
            .or(config.readiness_timeout_secs)
            .unwrap_or(defaults::DEFAULT_READINESS_TIMEOUT_SECS);
        let idle_secs = config
            .idle_timeout_secs
            .unwrap_or(defaults::DEFAULT_IDLE_TIMEOUT_SECS);

        let browser = config.browser.clone().unwrap_or_default();
        let launch = LaunchOptions {
            executable: cli
                .chrome
                .clone()
                .or_else(|| browser.executable.map(PathBuf::from)),
            headless: cli.headless || browser.headless.unwrap_or(false),
            debugging_port: browser
                .debugging_port
                .unwrap_or(defaults::DEFAULT_DEBUGGING_PORT),
            launch_timeout: Duration::from_secs(
                browser
                    .launch_timeout_secs
                    .unwrap_or(defaults::DEFAULT_LAUNCH_TIMEOUT_SECS),
            ),
        };

        Ok(Self {
            email: cli.email.clone().or_else(|| config.email.clone()),
            scan: ScanSettings {
                target,
                clock_in,
                clock_out,
                dry_run: cli.dry_run,
                readiness_timeout: Duration::from_secs(readiness_secs),
                idle_timeout: Duration::from_secs(idle_secs),
            },
            launch,
            json: cli.json,
        })
    }
}

fn config_time(value: Option<&str>, fallback: ClockTime) -> Result<ClockTime> {
    match value {
        Some(raw) => Ok(raw.parse()?),
        None => Ok(fallback),
    }
}

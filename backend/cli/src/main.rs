mod options;
mod progress;
mod prompt;
mod terminal_output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use clockin_browser::ChromeSession;
use clockin_config::{config_dir, config_file_path, defaults, validate};
use clockin_core::{ClockInError, ClockTime, ReadinessTracker, ScanOrchestrator, ScanReport};
use clockin_logging::{init_logger, AttendanceEvent, AttendanceEventLogger};

use options::RunOptions;
use progress::TerminalProgress;
use terminal_output::{note_error, note_info, note_status, note_warn};

/// Buffer between the browser's network events and the readiness tracker.
const FEED_BUFFER: usize = 256;

#[derive(Parser, Debug)]
#[command(name = "clockin")]
#[command(about = "Fill in a month of Factorial attendance")]
#[command(version)]
struct Cli {
    /// Year to fill in (defaults to the current one)
    #[arg(short, long, value_name = "YYYY", requires = "month")]
    year: Option<i32>,

    /// Month to fill in, 1-12 (defaults to the current one)
    #[arg(
        short,
        long,
        value_name = "MM",
        requires = "year",
        value_parser = clap::value_parser!(u32).range(1..=12)
    )]
    month: Option<u32>,

    /// Shift start
    #[arg(long = "clock-in", visible_alias = "ci", value_name = "HH:MM")]
    clock_in: Option<ClockTime>,

    /// Shift end
    #[arg(long = "clock-out", visible_alias = "co", value_name = "HH:MM")]
    clock_out: Option<ClockTime>,

    /// Factorial login e-mail (prompted when absent)
    #[arg(short, long)]
    email: Option<String>,

    /// Walk the month and report, but send nothing
    #[arg(long = "dry-run", visible_alias = "dr")]
    dry_run: bool,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,

    /// Path to a Chromium-family executable
    #[arg(long, value_name = "PATH")]
    chrome: Option<PathBuf>,

    /// Seconds to wait for each readiness signal
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    readiness_timeout: Option<u64>,

    /// Config file (defaults to ~/.clockin/config.yaml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the run report as JSON instead of progress lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            note_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));
    let config = clockin_config::load_and_prepare(&config_path).await?;

    let report = validate(&config);
    for warning in &report.warnings {
        note_warn(&warning.to_string());
    }
    if !report.is_valid() {
        let messages: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
        bail!("Invalid config {}:\n  {}", config_path.display(), messages.join("\n  "));
    }

    let logging = config.logging.clone().unwrap_or_default();
    init_logger(
        logging.dir.as_deref(),
        logging.level.as_deref().unwrap_or(defaults::DEFAULT_LOG_LEVEL),
    );

    let options = RunOptions::resolve(&cli, &config)?;
    let (email, password) = collect_credentials(options.email.clone()).await?;

    let run_id = Uuid::new_v4();
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted; stopping");
                cancel.cancel();
            }
        });
    }

    let result = scan(&options, run_id, &email, &password, cancel).await;
    match &result {
        Ok(report) => AttendanceEventLogger::log_event(
            &run_id.to_string(),
            AttendanceEvent::RunFinished {
                submitted: report.submitted(),
                skipped: report.skipped(),
            },
        ),
        Err(e) => AttendanceEventLogger::log_event(
            &run_id.to_string(),
            AttendanceEvent::RunFailed {
                error_msg: format!("{e:#}"),
            },
        ),
    }
    let report = result?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if options.scan.dry_run {
            note_info("Dry run: nothing was sent");
        }
        println!("done!");
    }
    Ok(())
}

async fn collect_credentials(email: Option<String>) -> Result<(String, String)> {
    tokio::task::spawn_blocking(move || {
        let email = match email {
            Some(email) => email,
            None => prompt::read_line("Email: ")?,
        };
        prompt::validate_email(&email)?;
        let password = prompt::read_password("Password: ")?;
        Ok((email, password))
    })
    .await
    .context("Credential prompt task failed")?
}

/// Launches the browser, logs in, runs the scan, and always closes the
/// browser afterwards.
async fn scan(
    options: &RunOptions,
    run_id: Uuid,
    email: &str,
    password: &str,
    cancel: CancellationToken,
) -> Result<ScanReport> {
    let tracker = Arc::new(ReadinessTracker::new());
    let (feed_tx, feed_rx) = mpsc::channel(FEED_BUFFER);
    let feed = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move { tracker.run(feed_rx).await })
    };

    let progress = TerminalProgress::new(run_id.to_string(), options.json);
    if !options.json {
        note_status("Logging in..");
    }
    let session = ChromeSession::launch(&options.launch, feed_tx)
        .await
        .context("Failed to start the browser")?;
    info!(run_id = %run_id, target = %options.scan.target, "Browser ready");

    let outcome = drive(&session, &tracker, options, run_id, email, password, &progress, cancel).await;

    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close browser cleanly");
    }
    feed.abort();

    outcome.map_err(|e| {
        error!(run_id = %run_id, error = %e, "Run failed");
        anyhow::Error::new(e)
    })
}

#[allow(clippy::too_many_arguments)]
async fn drive(
    session: &ChromeSession,
    tracker: &ReadinessTracker,
    options: &RunOptions,
    run_id: Uuid,
    email: &str,
    password: &str,
    progress: &TerminalProgress,
    cancel: CancellationToken,
) -> Result<ScanReport, ClockInError> {
    tokio::select! {
        _ = cancel.cancelled() => return Err(ClockInError::Cancelled),
        login = session.login(email, password) => login?,
    }

    ScanOrchestrator::new(session, tracker, options.scan.clone())
        .with_run_id(run_id)
        .with_observer(progress)
        .with_cancellation(cancel)
        .run()
        .await
}

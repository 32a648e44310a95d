//! Scan Orchestrator
//!
//! Sequences a run: wait for the session to settle, open the month's
//! attendance view, wait for the period id, then walk the table one row at a
//! time and submit a shift for every eligible day.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::eligibility::{classify, DayClassification, DayRow, SkipReason};
use crate::error::{ClockInError, ReadinessSignal, RowParseError};
use crate::readiness::ReadinessTracker;
use crate::submission::{SubmissionBuilder, SubmissionOutcome};
use crate::traits::{AttendanceSession, ScanObserver};
use crate::types::{ClockTime, TargetMonth};

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub target: TargetMonth,
    pub clock_in: ClockTime,
    pub clock_out: ClockTime,
    pub dry_run: bool,
    pub readiness_timeout: Duration,
    pub idle_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DayResult {
    Submitted {
        clock_in: ClockTime,
        clock_out: ClockTime,
        outcome: SubmissionOutcome,
    },
    Skipped {
        reason: SkipReason,
    },
}

/// What happened to one table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayOutcome {
    pub index: usize,
    /// `"05 March"` for day rows, `"row N"` when the date was unreadable.
    pub label: String,
    pub week_day: Option<String>,
    pub day: Option<u32>,
    pub result: DayResult,
}

impl DayOutcome {
    fn unreadable(err: &RowParseError) -> Self {
        Self {
            index: err.index,
            label: format!("row {}", err.index + 1),
            week_day: None,
            day: None,
            result: DayResult::Skipped {
                reason: SkipReason::parse_error(err),
            },
        }
    }

    fn for_row(index: usize, row: &DayRow, day: Option<u32>, result: DayResult) -> Self {
        Self {
            index,
            label: row.display_date(),
            week_day: Some(row.week_day.clone()),
            day,
            result,
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self.result, DayResult::Submitted { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub run_id: Uuid,
    pub target: TargetMonth,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<DayOutcome>,
}

impl ScanReport {
    pub fn submitted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_submitted()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.submitted()
    }
}

pub struct ScanOrchestrator<'a, S: AttendanceSession + ?Sized> {
    session: &'a S,
    tracker: &'a ReadinessTracker,
    settings: ScanSettings,
    observer: Option<&'a dyn ScanObserver>,
    cancel: CancellationToken,
    run_id: Uuid,
}

impl<'a, S: AttendanceSession + ?Sized> ScanOrchestrator<'a, S> {
    pub fn new(session: &'a S, tracker: &'a ReadinessTracker, settings: ScanSettings) -> Self {
        Self {
            session,
            tracker,
            settings,
            observer: None,
            cancel: CancellationToken::new(),
            run_id: Uuid::new_v4(),
        }
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn ScanObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self) -> Result<ScanReport, ClockInError> {
        let run_id = self.run_id;
        let started_at = Utc::now();
        let settings = &self.settings;
        info!(
            run_id = %run_id,
            target = %settings.target,
            dry_run = settings.dry_run,
            "Starting attendance scan"
        );

        self.status("Waiting for factorial..");
        self.tracker
            .wait_for_navigation(settings.readiness_timeout, &self.cancel)
            .await?;
        self.resolved(ReadinessSignal::Navigation);

        let url = settings.target.clock_in_url();
        self.status("Still waiting for factorial..");
        self.until_cancelled(self.session.goto(&url))
            .await?
            .map_err(|e| ClockInError::NavigationFailed(format!("{url}: {e:#}")))?;
        self.until_cancelled(self.session.wait_for_network_idle(settings.idle_timeout))
            .await?
            .map_err(|e| ClockInError::NavigationFailed(format!("{url}: {e:#}")))?;

        self.status("Obtaining period ID..");
        let period_id = self
            .tracker
            .wait_for_period_id(settings.readiness_timeout, &self.cancel)
            .await?;
        self.resolved(ReadinessSignal::PeriodId);
        debug!(run_id = %run_id, period_id = %period_id, "Scanning attendance table");

        let rows = self.until_cancelled(self.session.day_rows()).await??;
        let builder = SubmissionBuilder::new(settings.clock_in, settings.clock_out, settings.dry_run);

        let mut outcomes = Vec::with_capacity(rows.len());
        for (index, extracted) in rows.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(ClockInError::Cancelled);
            }
            let outcome = self.process_row(&builder, index, extracted).await?;
            if let Some(observer) = self.observer {
                observer.day_outcome(&outcome);
            }
            outcomes.push(outcome);
        }

        let report = ScanReport {
            run_id,
            target: settings.target,
            dry_run: settings.dry_run,
            started_at,
            outcomes,
        };
        info!(
            run_id = %run_id,
            submitted = report.submitted(),
            skipped = report.skipped(),
            "Attendance scan finished"
        );
        Ok(report)
    }

    async fn process_row(
        &self,
        builder: &SubmissionBuilder,
        index: usize,
        extracted: Result<DayRow, RowParseError>,
    ) -> Result<DayOutcome, ClockInError> {
        let row = match extracted {
            Ok(row) => row,
            Err(err) => {
                warn!(error = %err, "Skipping unreadable row");
                return Ok(DayOutcome::unreadable(&err));
            }
        };

        let day = match row.day_of_month() {
            Ok(day) => day,
            Err(message) => {
                let err = RowParseError::new(index, message);
                warn!(error = %err, "Skipping row with unreadable date");
                return Ok(DayOutcome::unreadable(&err));
            }
        };

        let result = match classify(&row) {
            DayClassification::Skip(reason) => {
                debug!(day, reason = %reason, "Skipping day");
                DayResult::Skipped { reason }
            }
            DayClassification::Eligible => {
                let period_id = self.tracker.period_id();
                let outcome = builder
                    .build_and_maybe_send(self.session, day, period_id.as_deref())
                    .await?;
                DayResult::Submitted {
                    clock_in: builder.clock_in,
                    clock_out: builder.clock_out,
                    outcome,
                }
            }
        };
        Ok(DayOutcome::for_row(index, &row, Some(day), result))
    }

    async fn until_cancelled<T>(&self, fut: impl Future<Output = T>) -> Result<T, ClockInError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ClockInError::Cancelled),
            value = fut => Ok(value),
        }
    }

    fn status(&self, message: &str) {
        if let Some(observer) = self.observer {
            observer.status(message);
        }
    }

    fn resolved(&self, signal: ReadinessSignal) {
        if let Some(observer) = self.observer {
            observer.readiness_resolved(signal);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::error::ReadinessSignal;
    use crate::submission::FetchRequest;
    use crate::traits::RequestExecutor;

    const PERIOD_URL: &str = "https://api.factorialhr.com/attendance/periods/4521";
    const TEAMS_URL: &str = "https://api.factorialhr.com/teams";

    struct FakeSession {
        tracker: Arc<ReadinessTracker>,
        rows: Vec<Result<DayRow, RowParseError>>,
        emit_period_on_goto: bool,
        visited: Mutex<Vec<String>>,
        sent: Mutex<Vec<FetchRequest>>,
    }

    impl FakeSession {
        fn new(tracker: Arc<ReadinessTracker>, rows: Vec<Result<DayRow, RowParseError>>) -> Self {
            Self {
                tracker,
                rows,
                emit_period_on_goto: true,
                visited: Mutex::new(Vec::new()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent_days(&self) -> Vec<u64> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|r| serde_json::from_str::<Value>(&r.body).unwrap()["day"].as_u64().unwrap())
                .collect()
        }
    }

    #[async_trait]
    impl RequestExecutor for FakeSession {
        async fn execute(&self, request: &FetchRequest) -> Result<()> {
            self.sent.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl AttendanceSession for FakeSession {
        async fn goto(&self, url: &str) -> Result<()> {
            self.visited.lock().unwrap().push(url.to_string());
            if self.emit_period_on_goto {
                self.tracker.observe_request(PERIOD_URL);
            }
            Ok(())
        }

        async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<()> {
            Ok(())
        }

        async fn day_rows(&self) -> Result<Vec<Result<DayRow, RowParseError>>> {
            Ok(self.rows.clone())
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        lines: Mutex<Vec<String>>,
    }

    impl ScanObserver for RecordingObserver {
        fn status(&self, _message: &str) {}

        fn day_outcome(&self, outcome: &DayOutcome) {
            self.lines.lock().unwrap().push(outcome.label.clone());
        }
    }

    fn day(week_day: &str, month_day: &str, hours: &str, leave: Option<&str>) -> DayRow {
        DayRow {
            week_day: week_day.into(),
            month_day: month_day.into(),
            hours_logged: hours.into(),
            leave_label: leave.map(Into::into),
        }
    }

    fn settings(dry_run: bool) -> ScanSettings {
        ScanSettings {
            target: TargetMonth::new(2024, 3).unwrap(),
            clock_in: "09:00".parse().unwrap(),
            clock_out: "17:00".parse().unwrap(),
            dry_run,
            readiness_timeout: Duration::from_millis(200),
            idle_timeout: Duration::from_millis(200),
        }
    }

    fn month_rows() -> Vec<Result<DayRow, RowParseError>> {
        vec![
            Err(RowParseError::new(0, "header row")),
            Ok(day("Monday", "11 March", "0h", Some("Public holiday"))),
            Ok(day("Tuesday", "12 March", "8h", None)),
            Ok(day("Wednesday", "13 March", "0h", None)),
            Ok(day("Thursday", "14 March", "0h", None)),
            Ok(day("Saturday", "16 March", "0h", None)),
        ]
    }

    #[tokio::test]
    async fn submits_one_shift_per_eligible_day() {
        let tracker = Arc::new(ReadinessTracker::new());
        tracker.observe_response(TEAMS_URL);
        let session = FakeSession::new(Arc::clone(&tracker), month_rows());
        let observer = RecordingObserver::default();

        let report = ScanOrchestrator::new(&session, &tracker, settings(false))
            .with_observer(&observer)
            .run()
            .await
            .unwrap();

        assert_eq!(
            session.visited.lock().unwrap().as_slice(),
            ["https://app.factorialhr.com/attendance/clock-in/2024/3"]
        );
        assert_eq!(session.sent_days(), vec![13, 14]);
        assert_eq!(report.submitted(), 2);
        assert_eq!(report.skipped(), 4);
        assert_eq!(observer.lines.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn outcomes_carry_the_specific_skip_reason() {
        let tracker = Arc::new(ReadinessTracker::new());
        tracker.observe_response(TEAMS_URL);
        let session = FakeSession::new(Arc::clone(&tracker), month_rows());

        let report = ScanOrchestrator::new(&session, &tracker, settings(false))
            .run()
            .await
            .unwrap();

        let reasons: Vec<Option<SkipReason>> = report
            .outcomes
            .iter()
            .map(|o| match &o.result {
                DayResult::Skipped { reason } => Some(reason.clone()),
                DayResult::Submitted { .. } => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                Some(SkipReason::ParseError("header row".into())),
                Some(SkipReason::Leave("Public holiday".into())),
                Some(SkipReason::AlreadyClocked),
                None,
                None,
                Some(SkipReason::Weekend),
            ]
        );
        assert_eq!(report.outcomes[0].label, "row 1");
        assert_eq!(report.outcomes[3].label, "13 March");
    }

    #[tokio::test]
    async fn eligible_row_builds_exact_submission() {
        let tracker = Arc::new(ReadinessTracker::new());
        tracker.observe_response(TEAMS_URL);
        let rows = vec![Ok(day("Monday", "14 March", "0h", None))];
        let session = FakeSession::new(Arc::clone(&tracker), rows);

        ScanOrchestrator::new(&session, &tracker, settings(false))
            .run()
            .await
            .unwrap();

        let sent = session.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let body: Value = serde_json::from_str(&sent[0].body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "period_id": "4521",
                "day": 14,
                "clock_in": "09:00",
                "clock_out": "17:00",
                "minutes": 0,
                "observations": null,
                "history": [],
            })
        );
    }

    #[tokio::test]
    async fn unreadable_date_is_skipped_not_fatal() {
        let tracker = Arc::new(ReadinessTracker::new());
        tracker.observe_response(TEAMS_URL);
        let rows = vec![
            Ok(day("Monday", "March", "0h", None)),
            Ok(day("Tuesday", "5 March", "0h", None)),
        ];
        let session = FakeSession::new(Arc::clone(&tracker), rows);

        let report = ScanOrchestrator::new(&session, &tracker, settings(false))
            .run()
            .await
            .unwrap();

        assert!(matches!(
            report.outcomes[0].result,
            DayResult::Skipped { reason: SkipReason::ParseError(_) }
        ));
        assert_eq!(session.sent_days(), vec![5]);
    }

    #[tokio::test]
    async fn dry_run_reports_but_sends_nothing() {
        let tracker = Arc::new(ReadinessTracker::new());
        tracker.observe_response(TEAMS_URL);
        let session = FakeSession::new(Arc::clone(&tracker), month_rows());

        let report = ScanOrchestrator::new(&session, &tracker, settings(true))
            .run()
            .await
            .unwrap();

        assert_eq!(report.submitted(), 2);
        assert!(report.outcomes.iter().filter(|o| o.is_submitted()).all(|o| matches!(
            o.result,
            DayResult::Submitted { outcome: SubmissionOutcome::DryRunSkipped, .. }
        )));
        assert!(session.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_period_times_out_without_submissions() {
        let tracker = Arc::new(ReadinessTracker::new());
        tracker.observe_response(TEAMS_URL);
        let mut session = FakeSession::new(Arc::clone(&tracker), month_rows());
        session.emit_period_on_goto = false;

        let err = ScanOrchestrator::new(&session, &tracker, settings(false))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClockInError::ReadinessTimeout { signal: ReadinessSignal::PeriodId, .. }
        ));
        assert!(session.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn never_navigating_times_out_before_goto() {
        let tracker = Arc::new(ReadinessTracker::new());
        let session = FakeSession::new(Arc::clone(&tracker), month_rows());

        let err = ScanOrchestrator::new(&session, &tracker, settings(false))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClockInError::ReadinessTimeout { signal: ReadinessSignal::Navigation, .. }
        ));
        assert!(session.visited.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelled_run_sends_nothing() {
        let tracker = Arc::new(ReadinessTracker::new());
        let session = FakeSession::new(Arc::clone(&tracker), month_rows());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = ScanOrchestrator::new(&session, &tracker, settings(false))
            .with_cancellation(cancel)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, ClockInError::Cancelled));
        assert!(session.sent.lock().unwrap().is_empty());
    }
}

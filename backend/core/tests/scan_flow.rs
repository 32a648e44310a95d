use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use clockin_core::{
    AttendanceSession, ClockInError, DayOutcome, DayResult, DayRow, FetchRequest, NetworkEvent,
    ReadinessTracker, RequestExecutor, RowParseError, ScanObserver, ScanOrchestrator, ScanSettings,
    TargetMonth,
};

/// Session that reports its traffic through a channel, the way the browser
/// network monitor does.
struct ScriptedSession {
    events: mpsc::Sender<NetworkEvent>,
    rows: Vec<Result<DayRow, RowParseError>>,
    sent: Mutex<Vec<FetchRequest>>,
}

#[async_trait]
impl RequestExecutor for ScriptedSession {
    async fn execute(&self, request: &FetchRequest) -> Result<()> {
        self.sent.lock().unwrap().push(request.clone());
        Ok(())
    }
}

#[async_trait]
impl AttendanceSession for ScriptedSession {
    async fn goto(&self, url: &str) -> Result<()> {
        self.events.send(NetworkEvent::Request { url: url.to_string() }).await?;
        self.events
            .send(NetworkEvent::Request {
                url: "https://api.factorialhr.com/attendance/periods/880".into(),
            })
            .await?;
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
struct Lines(Mutex<Vec<String>>);

impl ScanObserver for Lines {
    fn status(&self, _message: &str) {}

    fn day_outcome(&self, outcome: &DayOutcome) {
        let line = match &outcome.result {
            DayResult::Submitted { clock_in, clock_out, .. } => {
                format!("{} ok {clock_in} - {clock_out}", outcome.label)
            }
            DayResult::Skipped { reason } => format!("{} skip {reason}", outcome.label),
        };
        self.0.lock().unwrap().push(line);
    }
}

fn row(week_day: &str, month_day: &str, hours: &str, leave: Option<&str>) -> Result<DayRow, RowParseError> {
    Ok(DayRow {
        week_day: week_day.into(),
        month_day: month_day.into(),
        hours_logged: hours.into(),
        leave_label: leave.map(Into::into),
    })
}

fn settings() -> ScanSettings {
    ScanSettings {
        target: TargetMonth::new(2023, 11).unwrap(),
        clock_in: "10:00".parse().unwrap(),
        clock_out: "18:00".parse().unwrap(),
        dry_run: false,
        readiness_timeout: Duration::from_secs(2),
        idle_timeout: Duration::from_secs(2),
    }
}

#[tokio::test]
async fn full_scan_over_event_feed() {
    let tracker = Arc::new(ReadinessTracker::new());
    let (tx, rx) = mpsc::channel(32);
    let feed = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move { tracker.run(rx).await })
    };

    tx.send(NetworkEvent::Response {
        url: "https://api.factorialhr.com/teams/42".into(),
    })
    .await
    .unwrap();

    let session = ScriptedSession {
        events: tx,
        rows: vec![
            Err(RowParseError::new(0, "no weekday cell")),
            row("dissabte", "4 novembre", "0h", None),
            row("Monday", "6 November", "0h", None),
            row("Tuesday", "7 November", "7h 30m", None),
            row("Wednesday", "8 November", "0h", Some("Vacation")),
        ],
        sent: Mutex::new(Vec::new()),
    };
    let lines = Lines::default();

    let report = ScanOrchestrator::new(&session, &tracker, settings())
        .with_observer(&lines)
        .run()
        .await
        .unwrap();

    assert_eq!(
        lines.0.lock().unwrap().as_slice(),
        [
            "row 1 skip Unreadable row (no weekday cell)",
            "04 novembre skip Weekend",
            "06 November ok 10:00 - 18:00",
            "07 November skip Already clocked in",
            "08 November skip Vacation",
        ]
    );
    assert_eq!(report.submitted(), 1);
    assert_eq!(tracker.period_id().as_deref(), Some("880"));

    let sent = session.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("\"period_id\":\"880\""));
    assert!(sent[0].body.contains("\"day\":6"));

    drop(sent);
    drop(session);
    feed.await.unwrap();
}

#[tokio::test]
async fn silent_feed_ends_in_readiness_timeout() {
    let tracker = Arc::new(ReadinessTracker::new());
    let (tx, _rx) = mpsc::channel(1);
    let session = ScriptedSession {
        events: tx,
        rows: vec![row("Monday", "6 November", "0h", None)],
        sent: Mutex::new(Vec::new()),
    };
    let mut quick = settings();
    quick.readiness_timeout = Duration::from_millis(50);

    let err = ScanOrchestrator::new(&session, &tracker, quick)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, ClockInError::ReadinessTimeout { .. }));
    assert!(session.sent.lock().unwrap().is_empty());
}

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::eligibility::DayRow;
use crate::error::{ReadinessSignal, RowParseError};
use crate::orchestrator::DayOutcome;
use crate::submission::FetchRequest;

/// Issues an HTTP request from inside the logged-in page, so the session's
/// cookies ride along.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: &FetchRequest) -> Result<()>;
}

/// The browser session a scan runs against.
#[async_trait]
pub trait AttendanceSession: RequestExecutor {
    async fn goto(&self, url: &str) -> Result<()>;

    /// Wait until the page has no requests in flight.
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()>;

    /// One entry per table row, in table order.
    async fn day_rows(&self) -> Result<Vec<Result<DayRow, RowParseError>>>;
}

/// Receives progress while a scan runs.
pub trait ScanObserver: Send + Sync {
    fn status(&self, message: &str);

    fn readiness_resolved(&self, _signal: ReadinessSignal) {}

    fn day_outcome(&self, outcome: &DayOutcome);
}

//! Clock-In Submission Builder
//!
//! Each eligible day gets its own freshly built, immutable submission; nothing
//! is shared between days.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::ClockInError;
use crate::traits::RequestExecutor;
use crate::types::{endpoints, ClockTime};

/// Body of one attendance-shift POST.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockInSubmission {
    pub minutes: u32,
    pub day: u32,
    pub observations: Option<String>,
    pub history: Vec<Value>,
    pub clock_in: ClockTime,
    pub clock_out: ClockTime,
    pub period_id: String,
}

impl ClockInSubmission {
    pub fn new(period_id: &str, day: u32, clock_in: ClockTime, clock_out: ClockTime) -> Self {
        Self {
            minutes: 0,
            day,
            observations: None,
            history: Vec::new(),
            clock_in,
            clock_out,
            period_id: period_id.to_string(),
        }
    }

    pub fn to_request(&self) -> Result<FetchRequest, ClockInError> {
        let body = serde_json::to_string(self)
            .map_err(|e| ClockInError::Session(anyhow::Error::new(e).context("serializing shift")))?;
        Ok(FetchRequest::post_json(endpoints::SHIFTS, body))
    }
}

/// A credentialed CORS request, shaped like the init object of `fetch()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub method: &'static str,
    pub body: String,
}

impl FetchRequest {
    pub fn post_json(url: impl Into<String>, body: String) -> Self {
        Self {
            url: url.into(),
            method: "POST",
            body,
        }
    }

    /// The second argument to `fetch(url, init)`.
    pub fn init(&self) -> Value {
        json!({
            "method": self.method,
            "mode": "cors",
            "cache": "no-cache",
            "credentials": "include",
            "headers": { "Content-Type": "application/json" },
            "redirect": "follow",
            "body": self.body,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Sent,
    DryRunSkipped,
}

#[derive(Debug, Clone, Copy)]
pub struct SubmissionBuilder {
    pub clock_in: ClockTime,
    pub clock_out: ClockTime,
    pub dry_run: bool,
}

impl SubmissionBuilder {
    pub fn new(clock_in: ClockTime, clock_out: ClockTime, dry_run: bool) -> Self {
        Self {
            clock_in,
            clock_out,
            dry_run,
        }
    }

    /// Build the submission for `day`. Calling this before the period id is
    /// known is a caller bug and reported as `PreconditionViolation`.
    pub fn build(&self, day: u32, period_id: Option<&str>) -> Result<ClockInSubmission, ClockInError> {
        if !(1..=31).contains(&day) {
            return Err(ClockInError::PreconditionViolation(format!(
                "day {day} is outside 1-31"
            )));
        }
        let period_id = period_id.filter(|id| !id.is_empty()).ok_or_else(|| {
            ClockInError::PreconditionViolation(format!(
                "submission for day {day} built without a period id"
            ))
        })?;
        Ok(ClockInSubmission::new(period_id, day, self.clock_in, self.clock_out))
    }

    pub async fn build_and_maybe_send<E>(
        &self,
        executor: &E,
        day: u32,
        period_id: Option<&str>,
    ) -> Result<SubmissionOutcome, ClockInError>
    where
        E: RequestExecutor + ?Sized,
    {
        let submission = self.build(day, period_id)?;
        let request = submission.to_request()?;

        if self.dry_run {
            debug!(day, body = %request.body, "Dry run, not sending shift");
            return Ok(SubmissionOutcome::DryRunSkipped);
        }

        executor.execute(&request).await?;
        info!(
            day,
            clock_in = %submission.clock_in,
            clock_out = %submission.clock_out,
            "Shift submitted"
        );
        Ok(SubmissionOutcome::Sent)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::Result;
    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct RecordingExecutor {
        sent: Mutex<Vec<FetchRequest>>,
    }

    #[async_trait]
    impl RequestExecutor for RecordingExecutor {
        async fn execute(&self, request: &FetchRequest) -> Result<()> {
            self.sent.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    fn builder(dry_run: bool) -> SubmissionBuilder {
        SubmissionBuilder::new(
            "09:00".parse().unwrap(),
            "17:00".parse().unwrap(),
            dry_run,
        )
    }

    #[test]
    fn wire_body_matches_shift_endpoint() {
        let submission = builder(false).build(14, Some("4521")).unwrap();
        let body: Value = serde_json::to_value(&submission).unwrap();
        assert_eq!(
            body,
            json!({
                "minutes": 0,
                "day": 14,
                "observations": null,
                "history": [],
                "clock_in": "09:00",
                "clock_out": "17:00",
                "period_id": "4521",
            })
        );
    }

    #[test]
    fn out_of_range_day_is_a_precondition_violation() {
        for day in [0, 32] {
            let err = builder(false).build(day, Some("4521")).unwrap_err();
            assert!(matches!(err, ClockInError::PreconditionViolation(_)));
        }
        assert!(builder(false).build(31, Some("4521")).is_ok());
    }

    #[test]
    fn missing_period_id_is_a_precondition_violation() {
        let err = builder(false).build(3, None).unwrap_err();
        assert!(matches!(err, ClockInError::PreconditionViolation(_)));
        let err = builder(false).build(3, Some("")).unwrap_err();
        assert!(matches!(err, ClockInError::PreconditionViolation(_)));
    }

    #[test]
    fn fetch_init_is_credentialed_json_post() {
        let request = builder(false).build(1, Some("1")).unwrap().to_request().unwrap();
        assert_eq!(request.url, "https://api.factorialhr.com/attendance/shifts");
        let init = request.init();
        assert_eq!(init["method"], "POST");
        assert_eq!(init["mode"], "cors");
        assert_eq!(init["credentials"], "include");
        assert_eq!(init["headers"]["Content-Type"], "application/json");
        let body: Value = serde_json::from_str(init["body"].as_str().unwrap()).unwrap();
        assert_eq!(body["day"], 1);
    }

    #[tokio::test]
    async fn sends_one_request_per_call() {
        let executor = RecordingExecutor::default();
        let b = builder(false);
        assert_eq!(
            b.build_and_maybe_send(&executor, 14, Some("4521")).await.unwrap(),
            SubmissionOutcome::Sent
        );
        b.build_and_maybe_send(&executor, 15, Some("4521")).await.unwrap();

        let sent = executor.sent.lock().unwrap();
        let days: Vec<u64> = sent
            .iter()
            .map(|r| serde_json::from_str::<Value>(&r.body).unwrap()["day"].as_u64().unwrap())
            .collect();
        assert_eq!(days, vec![14, 15]);
    }

    #[tokio::test]
    async fn dry_run_issues_no_requests() {
        let executor = RecordingExecutor::default();
        let outcome = builder(true)
            .build_and_maybe_send(&executor, 14, Some("4521"))
            .await
            .unwrap();
        assert_eq!(outcome, SubmissionOutcome::DryRunSkipped);
        assert!(executor.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dry_run_still_enforces_period_id() {
        let executor = RecordingExecutor::default();
        let err = builder(true)
            .build_and_maybe_send(&executor, 14, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClockInError::PreconditionViolation(_)));
    }
}

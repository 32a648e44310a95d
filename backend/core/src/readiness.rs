//! Readiness Signal Tracker
//!
//! Watches the browser's network traffic for the two facts a run depends on:
//! the session has finished its initial navigation, and the attendance
//! period id is known. Each fact lives in a `watch` cell that is written at
//! most once, so waiters resolve on the first occurrence without polling.

use std::future::Future;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ClockInError, ReadinessSignal};
use crate::types::endpoints;

/// One observed url on the browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    Request { url: String },
    Response { url: String },
}

pub struct ReadinessTracker {
    navigation: watch::Sender<bool>,
    period: watch::Sender<Option<String>>,
}

impl ReadinessTracker {
    pub fn new() -> Self {
        let (navigation, _) = watch::channel(false);
        let (period, _) = watch::channel(None);
        Self { navigation, period }
    }

    pub fn observe(&self, event: &NetworkEvent) {
        match event {
            NetworkEvent::Request { url } => self.observe_request(url),
            NetworkEvent::Response { url } => self.observe_response(url),
        }
    }

    /// An outbound request to the periods endpoint carries the period id and
    /// also proves the session has navigated.
    pub fn observe_request(&self, url: &str) {
        if !url.contains(endpoints::PERIODS_PREFIX) {
            return;
        }
        match trailing_segment(url) {
            Some(id) => self.store_period_id(id),
            None => warn!(url = %url, "Periods request without an id segment"),
        }
        self.mark_navigation_ready("periods request");
    }

    pub fn observe_response(&self, url: &str) {
        if url.contains(endpoints::TEAMS_PREFIX) {
            self.mark_navigation_ready("teams response");
        }
    }

    pub fn is_navigation_ready(&self) -> bool {
        *self.navigation.borrow()
    }

    pub fn period_id(&self) -> Option<String> {
        self.period.borrow().clone()
    }

    /// Resolves once navigation readiness has been observed.
    pub async fn wait_for_navigation(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), ClockInError> {
        let mut rx = self.navigation.subscribe();
        let ready = async move { rx.wait_for(|ready| *ready).await.map(|_| ()) };
        wait_signal(ReadinessSignal::Navigation, timeout, cancel, ready).await
    }

    /// Resolves with the period id once it has been observed.
    pub async fn wait_for_period_id(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<String, ClockInError> {
        let mut rx = self.period.subscribe();
        let resolved = async move {
            rx.wait_for(Option::is_some)
                .await
                .map(|id| (*id).clone())
        };
        wait_signal(ReadinessSignal::PeriodId, timeout, cancel, resolved)
            .await?
            .ok_or_else(|| ClockInError::PreconditionViolation("period id resolved empty".into()))
    }

    /// Feed the tracker from a channel until every sender is dropped.
    pub async fn run(&self, mut rx: mpsc::Receiver<NetworkEvent>) {
        while let Some(event) = rx.recv().await {
            self.observe(&event);
        }
        debug!("Network event feed closed");
    }

    fn store_period_id(&self, id: &str) {
        let stored = self.period.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(id.to_string());
            true
        });
        if stored {
            info!(period_id = %id, "Attendance period id resolved");
        } else {
            debug!(period_id = %id, "Period id already set, ignoring");
        }
    }

    fn mark_navigation_ready(&self, source: &str) {
        let flipped = self.navigation.send_if_modified(|ready| !std::mem::replace(ready, true));
        if flipped {
            info!(source, "Session navigation ready");
        }
    }
}

impl Default for ReadinessTracker {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_signal<T>(
    signal: ReadinessSignal,
    timeout: Duration,
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, watch::error::RecvError>>,
) -> Result<T, ClockInError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ClockInError::Cancelled),
        res = tokio::time::timeout(timeout, fut) => match res {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(anyhow!("readiness channel for {signal} closed").into()),
            Err(_) => Err(ClockInError::ReadinessTimeout { signal, waited: timeout }),
        },
    }
}

/// Last path segment of a url, ignoring query and fragment.
fn trailing_segment(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().filter(|segment| !segment.is_empty())
}

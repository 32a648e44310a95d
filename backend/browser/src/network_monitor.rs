//! Network Monitor
//!
//! Turns the page's `Network.*` events into the url feed the readiness
//! tracker consumes, and keeps a count of in-flight requests so callers can
//! wait for the network to go quiet.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use clockin_core::NetworkEvent;

use crate::cdp_client::CdpEvent;

#[derive(Debug, PartialEq, Eq)]
enum Activity {
    Started { request_id: String, url: String },
    Responded { url: String },
    Finished { request_id: String },
}

fn activity(event: &CdpEvent) -> Option<Activity> {
    let params = &event.params;
    let request_id = || params["requestId"].as_str().map(str::to_string);
    match event.method.as_str() {
        "Network.requestWillBeSent" => Some(Activity::Started {
            request_id: request_id()?,
            url: params["request"]["url"].as_str()?.to_string(),
        }),
        "Network.responseReceived" => Some(Activity::Responded {
            url: params["response"]["url"].as_str()?.to_string(),
        }),
        "Network.loadingFinished" | "Network.loadingFailed" => Some(Activity::Finished {
            request_id: request_id()?,
        }),
        _ => None,
    }
}

pub struct NetworkMonitor {
    inflight: watch::Receiver<usize>,
    task: JoinHandle<()>,
}

impl NetworkMonitor {
    /// Starts consuming `events`; observed urls are forwarded to `feed`.
    pub fn spawn(events: broadcast::Receiver<CdpEvent>, feed: mpsc::Sender<NetworkEvent>) -> Self {
        let (count_tx, inflight) = watch::channel(0usize);
        let task = tokio::spawn(monitor_loop(events, feed, count_tx));
        Self { inflight, task }
    }

    pub fn inflight(&self) -> usize {
        *self.inflight.borrow()
    }

    /// Resolves once no request has been in flight for `quiet`.
    pub async fn wait_for_idle(&self, quiet: Duration, timeout: Duration) -> Result<()> {
        let mut rx = self.inflight.clone();
        let settle = async move {
            loop {
                rx.wait_for(|n| *n == 0).await.map(|_| ())?;
                match tokio::time::timeout(quiet, rx.wait_for(|n| *n > 0)).await {
                    Err(_) => return Ok::<_, watch::error::RecvError>(()),
                    Ok(busy) => busy.map(|_| ())?,
                }
            }
        };
        tokio::time::timeout(timeout, settle)
            .await
            .with_context(|| format!("Network still busy after {timeout:?}"))?
            .context("Network monitor stopped")
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn monitor_loop(
    mut events: broadcast::Receiver<CdpEvent>,
    feed: mpsc::Sender<NetworkEvent>,
    count: watch::Sender<usize>,
) {
    let mut inflight: HashSet<String> = HashSet::new();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "Network monitor fell behind; idle tracking may be off");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let Some(activity) = activity(&event) else { continue };

        let forwarded = match activity {
            Activity::Started { request_id, url } => {
                inflight.insert(request_id);
                Some(NetworkEvent::Request { url })
            }
            Activity::Responded { url } => Some(NetworkEvent::Response { url }),
            Activity::Finished { request_id } => {
                inflight.remove(&request_id);
                None
            }
        };
        count.send_if_modified(|n| std::mem::replace(n, inflight.len()) != inflight.len());

        if let Some(network_event) = forwarded {
            if feed.send(network_event).await.is_err() {
                debug!("Readiness feed dropped");
            }
        }
    }
    debug!("Network monitor stopped");
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(method: &str, params: serde_json::Value) -> CdpEvent {
        CdpEvent {
            method: method.into(),
            params,
        }
    }

    #[test]
    fn maps_network_events() {
        let started = event(
            "Network.requestWillBeSent",
            json!({"requestId": "1", "request": {"url": "https://a/b"}}),
        );
        assert_eq!(
            activity(&started),
            Some(Activity::Started {
                request_id: "1".into(),
                url: "https://a/b".into()
            })
        );
        let done = event("Network.loadingFailed", json!({"requestId": "1"}));
        assert_eq!(
            activity(&done),
            Some(Activity::Finished { request_id: "1".into() })
        );
        assert_eq!(activity(&event("Page.loadEventFired", json!({}))), None);
    }

    #[tokio::test]
    async fn forwards_urls_and_tracks_inflight() {
        let (events_tx, events_rx) = broadcast::channel(16);
        let (feed_tx, mut feed_rx) = mpsc::channel(16);
        let monitor = NetworkMonitor::spawn(events_rx, feed_tx);

        events_tx
            .send(event(
                "Network.requestWillBeSent",
                json!({"requestId": "9", "request": {"url": "https://api.factorialhr.com/attendance/periods/1"}}),
            ))
            .unwrap();
        events_tx
            .send(event(
                "Network.responseReceived",
                json!({"requestId": "9", "response": {"url": "https://api.factorialhr.com/teams"}}),
            ))
            .unwrap();

        assert_eq!(
            feed_rx.recv().await,
            Some(NetworkEvent::Request {
                url: "https://api.factorialhr.com/attendance/periods/1".into()
            })
        );
        assert_eq!(
            feed_rx.recv().await,
            Some(NetworkEvent::Response {
                url: "https://api.factorialhr.com/teams".into()
            })
        );
        assert_eq!(monitor.inflight(), 1);

        events_tx
            .send(event("Network.loadingFinished", json!({"requestId": "9"})))
            .unwrap();
        monitor
            .wait_for_idle(Duration::from_millis(20), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(monitor.inflight(), 0);
    }

    #[tokio::test]
    async fn busy_network_times_out() {
        let (events_tx, events_rx) = broadcast::channel(16);
        let (feed_tx, _feed_rx) = mpsc::channel(16);
        let monitor = NetworkMonitor::spawn(events_rx, feed_tx);
        events_tx
            .send(event(
                "Network.requestWillBeSent",
                json!({"requestId": "1", "request": {"url": "https://slow"}}),
            ))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let result = monitor
            .wait_for_idle(Duration::from_millis(10), Duration::from_millis(50))
            .await;
        assert!(result.is_err());
    }
}

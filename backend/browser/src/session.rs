//! Chrome-backed attendance session.
//!
//! Owns the browser process, the CDP connection to its tab and the network
//! monitor feeding the readiness tracker.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use clockin_core::{
    endpoints, AttendanceSession, ClockInError, DayRow, FetchRequest, NetworkEvent,
    RequestExecutor, RowParseError,
};
use clockin_logging::redact_sensitive_data;

use crate::cdp_client::CdpClient;
use crate::element_query::{selectors, ElementQuery};
use crate::launcher::{BrowserLauncher, BrowserProcess, LaunchOptions};
use crate::network_monitor::NetworkMonitor;
use crate::page_control::{js_string, PageControl};

/// How long the network must stay silent to count as idle.
const IDLE_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Pause after submitting the login form before looking for an error banner.
const LOGIN_SETTLE: Duration = Duration::from_secs(1);

const EMAIL_INPUT: &str = r#"input[name="user[email]"]"#;
const PASSWORD_INPUT: &str = "#user_password";

pub struct ChromeSession {
    process: BrowserProcess,
    client: Arc<CdpClient>,
    page: PageControl,
    monitor: NetworkMonitor,
}

impl ChromeSession {
    /// Launches the browser and starts forwarding its traffic to `feed`
    /// before any page is loaded.
    pub async fn launch(options: &LaunchOptions, feed: mpsc::Sender<NetworkEvent>) -> Result<Self> {
        let process = BrowserLauncher::launch(options).await?;
        let ws_endpoint = process.open_page().await?;
        let client = Arc::new(CdpClient::connect(&ws_endpoint).await?);

        let monitor = NetworkMonitor::spawn(client.subscribe(), feed);
        let page = PageControl::new(Arc::clone(&client));
        page.enable().await.context("Failed to enable CDP domains")?;

        Ok(Self {
            process,
            client,
            page,
            monitor,
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), ClockInError> {
        info!(email = %redact_sensitive_data(email), "Logging in");
        self.page
            .navigate(endpoints::SIGN_IN)
            .await
            .map_err(|e| ClockInError::NavigationFailed(format!("{e:#}")))?;
        self.wait_for_selector(EMAIL_INPUT, Duration::from_secs(15))
            .await
            .map_err(|e| ClockInError::LoginFailed(format!("{e:#}")))?;

        self.page.type_into(EMAIL_INPUT, email).await?;
        self.page.type_into(PASSWORD_INPUT, password).await?;
        self.page.press_enter().await?;
        sleep(LOGIN_SETTLE).await;

        // The page may be mid-navigation; a failed lookup means no banner.
        match ElementQuery::new(&self.page).text_of(selectors::LOGIN_ERROR).await {
            Ok(Some(text)) if !text.trim().is_empty() => {
                Err(ClockInError::LoginFailed(redact_sensitive_data(text.trim())))
            }
            Ok(_) => Ok(()),
            Err(e) => {
                debug!(error = %e, "Login banner check failed");
                Ok(())
            }
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let script = format!("document.querySelector({}) !== null", js_string(selector));
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(serde_json::Value::Bool(true)) = self.page.evaluate(&script).await {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!("{selector} did not appear within {timeout:?}");
            }
            sleep(Duration::from_millis(250)).await;
        }
    }

    pub async fn close(self) -> Result<()> {
        self.client.close();
        drop(self.monitor);
        self.process.close().await
    }
}

#[async_trait]
impl RequestExecutor for ChromeSession {
    async fn execute(&self, request: &FetchRequest) -> Result<()> {
        let script = format!(
            "fetch({}, {}).then((res) => res.status)",
            js_string(&request.url),
            request.init()
        );
        match self.page.evaluate(&script).await {
            Ok(status) => debug!(url = %request.url, status = %status, "Request issued"),
            Err(e) => {
                warn!(url = %request.url, error = %e, "Request failed");
                return Err(e);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AttendanceSession for ChromeSession {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page.navigate(url).await
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()> {
        self.monitor.wait_for_idle(IDLE_QUIET_PERIOD, timeout).await
    }

    async fn day_rows(&self) -> Result<Vec<Result<DayRow, RowParseError>>> {
        ElementQuery::new(&self.page).extract_day_rows().await
    }
}

//! Browser Launcher
//!
//! Starts a Chromium-family browser with remote debugging enabled and a
//! throwaway profile, then opens the page target the session drives.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Executables tried, in order, when none is configured.
const CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "msedge",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
];

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub debugging_port: u16,
    pub launch_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            executable: None,
            headless: false,
            debugging_port: 9222,
            launch_timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetInfo {
    web_socket_debugger_url: String,
}

/// A running browser. Killed on `close` or when dropped.
pub struct BrowserProcess {
    child: Child,
    port: u16,
    profile_dir: PathBuf,
    http: reqwest::Client,
}

pub struct BrowserLauncher;

impl BrowserLauncher {
    pub async fn launch(options: &LaunchOptions) -> Result<BrowserProcess> {
        let executable = match &options.executable {
            Some(path) => path.clone(),
            None => find_executable().context(
                "No Chrome or Chromium executable found; set browser.executable in the config",
            )?,
        };
        let profile_dir = std::env::temp_dir().join(format!("clockin-{}", Uuid::new_v4()));
        let args = chrome_args(options, &profile_dir);

        info!(
            executable = %executable.display(),
            port = options.debugging_port,
            headless = options.headless,
            "Launching browser"
        );
        let child = Command::new(&executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", executable.display()))?;

        let process = BrowserProcess {
            child,
            port: options.debugging_port,
            profile_dir,
            http: reqwest::Client::new(),
        };
        process.wait_until_listening(options.launch_timeout).await?;
        Ok(process)
    }
}

impl BrowserProcess {
    fn endpoint(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    async fn wait_until_listening(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let url = self.endpoint("/json/version");
        loop {
            match self.http.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!(url = %url, "Browser debugging endpoint is up");
                    return Ok(());
                }
                Ok(resp) => debug!(status = %resp.status(), "Debugging endpoint not ready"),
                Err(e) => debug!(error = %e, "Debugging endpoint not reachable yet"),
            }
            if Instant::now() >= deadline {
                bail!("Browser did not open its debugging port within {timeout:?}");
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Opens a blank tab and returns its debugger websocket url.
    pub async fn open_page(&self) -> Result<String> {
        let target: TargetInfo = self
            .http
            .put(self.endpoint("/json/new?about:blank"))
            .send()
            .await
            .context("Failed to open a browser tab")?
            .error_for_status()?
            .json()
            .await
            .context("Unexpected reply when opening a browser tab")?;
        Ok(target.web_socket_debugger_url)
    }

    pub async fn close(mut self) -> Result<()> {
        info!("Closing browser");
        if let Err(e) = self.child.kill().await {
            warn!(error = %e, "Browser already gone");
        }
        if let Err(e) = tokio::fs::remove_dir_all(&self.profile_dir).await {
            debug!(error = %e, dir = %self.profile_dir.display(), "Profile dir not removed");
        }
        Ok(())
    }
}

fn chrome_args(options: &LaunchOptions, profile_dir: &Path) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={}", options.debugging_port),
        format!("--user-data-dir={}", profile_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-background-networking".to_string(),
    ];
    if options.headless {
        args.push("--headless=new".to_string());
    }
    args.push("about:blank".to_string());
    args
}

fn find_executable() -> Option<PathBuf> {
    let path_dirs: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect())
        .unwrap_or_default();

    CANDIDATES.iter().find_map(|candidate| {
        let candidate = Path::new(candidate);
        if candidate.is_absolute() {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }
        path_dirs
            .iter()
            .map(|dir| dir.join(candidate))
            .find(|full| full.is_file())
    })
}

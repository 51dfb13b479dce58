use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use super::cdp::CdpConnection;
use super::context::BrowsingContext;
use super::error::BrowserError;

/// how long chrome gets to print its devtools endpoint
const STARTUP_TIMEOUT: Duration = Duration::from_secs(20);

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// headless, no automation fingerprint, and everything in one renderer process so the page
/// session sees requests and frames coming from cross-site iframes too
const LAUNCH_ARGS: &[&str] = &[
    "--headless=new",
    "--disable-blink-features=AutomationControlled",
    "--disable-dev-shm-usage",
    "--no-sandbox",
    "--disable-gpu",
    "--mute-audio",
    "--no-first-run",
    "--no-default-browser-check",
    "--autoplay-policy=no-user-gesture-required",
    "--disable-site-isolation-trials",
    "--disable-features=IsolateOrigins,site-per-process",
    "--remote-debugging-port=0",
];

/// a running chrome process plus its devtools connection. Owned by the pool, everyone else only
/// borrows it to open contexts
pub struct BrowserInstance {
    id: usize,
    connection: CdpConnection,
    process: Mutex<Option<Child>>,
    handler: JoinHandle<()>,
    _stderr_drain: JoinHandle<()>,
    // removed on drop, after the process field above is gone
    _profile: TempDir,
}

impl BrowserInstance {
    pub async fn launch(id: usize, chrome_path: &Path) -> Result<Self, BrowserError> {
        let profile = tempfile::Builder::new()
            .prefix("hattrick-chrome-")
            .tempdir()
            .map_err(|e| BrowserError::LaunchFailed {
                context: format!("profile dir: {e}"),
            })?;

        let mut child = Command::new(chrome_path)
            .args(LAUNCH_ARGS)
            .arg(format!("--user-data-dir={}", profile.path().display()))
            .arg("about:blank")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BrowserError::LaunchFailed {
                context: format!("{}: {e}", chrome_path.display()),
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BrowserError::LaunchFailed {
                context: "chrome stderr was not captured".to_string(),
            })?;

        // child is killed on drop if any of this fails
        let (ws_url, rest) = tokio::time::timeout(STARTUP_TIMEOUT, wait_for_ws_url(stderr))
            .await
            .map_err(|_| BrowserError::Timeout {
                timeout_ms: STARTUP_TIMEOUT.as_millis() as u64,
                context: format!("browser {id} devtools endpoint"),
            })??;

        // chrome keeps logging to stderr, somebody has to read it or it blocks on a full pipe
        let stderr_drain = tokio::spawn(drain_stderr(id, rest));

        let (connection, handler) = CdpConnection::connect(&ws_url).await?;

        info!("browser {} up at {}", id, ws_url);

        Ok(Self {
            id,
            connection,
            process: Mutex::new(Some(child)),
            handler,
            _stderr_drain: stderr_drain,
            _profile: profile,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// new isolated context with its own page, the caller is responsible for closing it
    pub async fn new_context(&self, user_agent: &str) -> Result<BrowsingContext, BrowserError> {
        if self.connection.is_closed() {
            return Err(BrowserError::Disconnected);
        }
        BrowsingContext::open(self.connection.clone(), user_agent).await
    }

    /// ask chrome to exit, kill it if it doesn't. Calling this twice is a no-op
    pub async fn close(&self) {
        let Some(mut child) = self.process.lock().await.take() else {
            return;
        };

        // the socket usually dies before a reply comes back, that's fine
        let _ = tokio::time::timeout(
            SHUTDOWN_TIMEOUT,
            self.connection.send("Browser.close", json!({}), None),
        )
        .await;

        if tokio::time::timeout(SHUTDOWN_TIMEOUT, child.wait())
            .await
            .is_err()
        {
            debug!("browser {} ignored Browser.close, killing it", self.id);
            let _ = child.kill().await;
        }

        self.handler.abort();
        debug!("browser {} closed", self.id);
    }
}

async fn wait_for_ws_url(
    stderr: ChildStderr,
) -> Result<(String, Lines<BufReader<ChildStderr>>), BrowserError> {
    let mut lines = BufReader::new(stderr).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| BrowserError::LaunchFailed {
            context: format!("reading chrome stderr: {e}"),
        })?
    {
        if let Some(url) = parse_devtools_line(&line) {
            return Ok((url, lines));
        }
        trace!("chrome: {}", line);
    }

    Err(BrowserError::LaunchFailed {
        context: "chrome exited before announcing its devtools endpoint".to_string(),
    })
}

async fn drain_stderr(id: usize, mut lines: Lines<BufReader<ChildStderr>>) {
    while let Ok(Some(line)) = lines.next_line().await {
        trace!("chrome {}: {}", id, line);
    }
}

fn parse_devtools_line(line: &str) -> Option<String> {
    line.trim()
        .strip_prefix("DevTools listening on ")
        .map(|url| url.trim().to_string())
        .filter(|url| url.starts_with("ws://"))
}

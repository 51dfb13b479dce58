//! One isolated browser context (own cookies and storage) holding a single page.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::json;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::cdp::{CdpConnection, CdpEvent};
use super::error::BrowserError;
use super::protocol::{
    AttachToTargetResult, CreateBrowserContextResult, CreateTargetResult, EvaluateResult,
    GetFrameTreeResult, LifecycleEvent, NavigateResult, RequestPaused,
};

/// called with the url of every request the page makes, the request always continues untouched
pub type RequestHook = Arc<dyn Fn(&str) + Send + Sync>;

type SharedHook = Arc<RwLock<Option<RequestHook>>>;

/// src of every iframe element, including the ones that never got a frame of their own
const IFRAME_SOURCES: &str = "Array.from(document.querySelectorAll('iframe[src]'), f => f.src)";

pub struct BrowsingContext {
    connection: CdpConnection,
    browser_context_id: String,
    session_id: String,
    hook: SharedHook,
    // loader id of every document that reached its load event
    loads: broadcast::Sender<String>,
    pump: JoinHandle<()>,
    closed: bool,
}

impl BrowsingContext {
    pub(crate) async fn open(
        connection: CdpConnection,
        user_agent: &str,
    ) -> Result<Self, BrowserError> {
        let created: CreateBrowserContextResult = connection
            .call(
                "Target.createBrowserContext",
                json!({ "disposeOnDetach": true }),
                None,
            )
            .await?;
        let browser_context_id = created.browser_context_id;

        // the context exists from here on, anything failing below must dispose of it
        let session_id = match attach_page(&connection, &browser_context_id).await {
            Ok(session_id) => session_id,
            Err(e) => {
                dispose(&connection, &browser_context_id);
                return Err(e);
            }
        };

        let events = connection.subscribe(&session_id);
        let hook = SharedHook::default();
        let (loads, _) = broadcast::channel(16);
        let pump = tokio::spawn(event_pump(
            connection.clone(),
            session_id.clone(),
            events,
            hook.clone(),
            loads.clone(),
        ));

        let context = Self {
            connection,
            browser_context_id,
            session_id,
            hook,
            loads,
            pump,
            closed: false,
        };

        // dropping on error tears everything down
        context.command("Page.enable", json!({})).await?;
        context
            .command(
                "Page.setLifecycleEventsEnabled",
                json!({ "enabled": true }),
            )
            .await?;
        context
            .command(
                "Network.setUserAgentOverride",
                json!({ "userAgent": user_agent }),
            )
            .await?;

        Ok(context)
    }

    /// pause every request so the hook sees it before it leaves the browser
    pub async fn intercept(&self, hook: RequestHook) -> Result<(), BrowserError> {
        *self.hook.write() = Some(hook);
        self.command(
            "Fetch.enable",
            json!({ "patterns": [{ "urlPattern": "*" }] }),
        )
        .await
        .map(|_| ())
    }

    /// navigate and wait for the load event of the new document, bounded by `timeout`. Loads of
    /// anything else (the blank start page, iframes) don't count
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let mut loads = self.loads.subscribe();

        let navigation = async {
            let result: NavigateResult = self
                .connection
                .call(
                    "Page.navigate",
                    json!({ "url": url }),
                    Some(&self.session_id),
                )
                .await?;
            if let Some(error_text) = result.error_text.filter(|e| !e.is_empty()) {
                return Err(BrowserError::Cdp(format!(
                    "navigation to {url} failed: {error_text}"
                )));
            }
            wait_for_load(&mut loads, result.loader_id.as_deref()).await
        };

        tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| BrowserError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
                context: format!("load event for {url}"),
            })?
    }

    /// urls of every frame attached to the page right now, main frame first
    pub async fn frame_urls(&self) -> Result<Vec<String>, BrowserError> {
        let result: GetFrameTreeResult = self
            .connection
            .call("Page.getFrameTree", json!({}), Some(&self.session_id))
            .await?;
        Ok(result.frame_tree.urls())
    }

    /// src attribute of every iframe in the document, lazy ones whose frame is still blank included
    pub async fn iframe_sources(&self) -> Result<Vec<String>, BrowserError> {
        let evaluated: EvaluateResult = self
            .connection
            .call(
                "Runtime.evaluate",
                json!({ "expression": IFRAME_SOURCES, "returnByValue": true }),
                Some(&self.session_id),
            )
            .await?;

        if let Some(details) = evaluated.exception_details {
            return Err(BrowserError::Cdp(format!("iframe lookup threw: {details}")));
        }

        let sources = evaluated
            .result
            .value
            .map(serde_json::from_value::<Vec<String>>)
            .transpose()
            .map_err(|e| BrowserError::Cdp(format!("unexpected iframe lookup result: {e}")))?
            .unwrap_or_default();

        Ok(sources)
    }

    /// dispose of the context and its page, waiting for the browser to confirm
    pub async fn close(mut self) {
        self.closed = true;
        self.pump.abort();
        self.connection.unsubscribe(&self.session_id);

        if let Err(e) = self
            .connection
            .send(
                "Target.disposeBrowserContext",
                json!({ "browserContextId": self.browser_context_id }),
                None,
            )
            .await
        {
            debug!("disposing browser context failed: {}", e);
        }
    }

    async fn command(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, BrowserError> {
        self.connection
            .send(method, params, Some(&self.session_id))
            .await
    }
}

impl Drop for BrowsingContext {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.pump.abort();
        self.connection.unsubscribe(&self.session_id);
        dispose(&self.connection, &self.browser_context_id);
    }
}

async fn wait_for_load(
    loads: &mut broadcast::Receiver<String>,
    loader_id: Option<&str>,
) -> Result<(), BrowserError> {
    loop {
        match loads.recv().await {
            Ok(loaded) if loader_id.is_none_or(|id| id == loaded) => return Ok(()),
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return Err(BrowserError::Disconnected),
        }
    }
}

async fn attach_page(
    connection: &CdpConnection,
    browser_context_id: &str,
) -> Result<String, BrowserError> {
    let target: CreateTargetResult = connection
        .call(
            "Target.createTarget",
            json!({ "url": "about:blank", "browserContextId": browser_context_id }),
            None,
        )
        .await?;

    let attached: AttachToTargetResult = connection
        .call(
            "Target.attachToTarget",
            json!({ "targetId": target.target_id, "flatten": true }),
            None,
        )
        .await?;

    Ok(attached.session_id)
}

fn dispose(connection: &CdpConnection, browser_context_id: &str) {
    connection.send_detached(
        "Target.disposeBrowserContext",
        json!({ "browserContextId": browser_context_id }),
        None,
    );
}

async fn event_pump(
    connection: CdpConnection,
    session_id: String,
    mut events: mpsc::UnboundedReceiver<CdpEvent>,
    hook: SharedHook,
    loads: broadcast::Sender<String>,
) {
    while let Some(event) = events.recv().await {
        match event.method.as_str() {
            "Fetch.requestPaused" => {
                let paused: RequestPaused = match serde_json::from_value(event.params) {
                    Ok(paused) => paused,
                    Err(e) => {
                        debug!("malformed Fetch.requestPaused: {}", e);
                        continue;
                    }
                };

                let current = hook.read().clone();
                if let Some(hook) = current {
                    hook(&paused.request.url);
                }

                connection.send_detached(
                    "Fetch.continueRequest",
                    json!({ "requestId": paused.request_id }),
                    Some(&session_id),
                );
            }
            "Page.lifecycleEvent" => match serde_json::from_value::<LifecycleEvent>(event.params) {
                Ok(lifecycle) if lifecycle.name == "load" => {
                    trace!("frame {} loaded {}", lifecycle.frame_id, lifecycle.loader_id);
                    // nobody navigating right now is fine
                    let _ = loads.send(lifecycle.loader_id);
                }
                Ok(_) => {}
                Err(e) => debug!("malformed Page.lifecycleEvent: {}", e),
            },
            other => trace!("unhandled event {}", other),
        }
    }
}

//! CDP connection over a single browser-level websocket.
//!
//! Commands go out through an mpsc channel to one handler task which owns the socket. Replies are
//! matched back by id, events carrying a `sessionId` are forwarded to whoever subscribed to that
//! session. Browser-level events (no session) are dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use super::error::BrowserError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

type PendingTx = oneshot::Sender<Result<Value, String>>;

type SessionRoutes = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<CdpEvent>>>>;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
}

struct CdpCommand {
    method: String,
    params: Value,
    session_id: Option<String>,
    // None for fire and forget commands
    response_tx: Option<PendingTx>,
}

/// cheap to clone, every clone talks to the same handler task
#[derive(Clone)]
pub struct CdpConnection {
    cmd_tx: mpsc::UnboundedSender<CdpCommand>,
    routes: SessionRoutes,
}

impl CdpConnection {
    pub async fn connect(ws_url: &str) -> Result<(Self, JoinHandle<()>), BrowserError> {
        let (ws, _) = connect_async(ws_url)
            .await
            .map_err(|e| BrowserError::LaunchFailed {
                context: format!("WebSocket connect: {e}"),
            })?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let routes = SessionRoutes::default();
        let handler = tokio::spawn(cdp_handler_loop(ws, cmd_rx, routes.clone()));

        Ok((Self { cmd_tx, routes }, handler))
    }

    pub async fn send(
        &self,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<Value, BrowserError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(CdpCommand {
                method: method.into(),
                params,
                session_id: session_id.map(String::from),
                response_tx: Some(tx),
            })
            .map_err(|_| BrowserError::Disconnected)?;

        let reply = tokio::time::timeout(COMMAND_TIMEOUT, rx)
            .await
            .map_err(|_| BrowserError::Timeout {
                timeout_ms: COMMAND_TIMEOUT.as_millis() as u64,
                context: format!("CDP {method}"),
            })?
            .map_err(|_| BrowserError::Disconnected)?;

        reply.map_err(BrowserError::Cdp)
    }

    /// send and deserialize the result into one of the protocol types
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<T, BrowserError> {
        let value = self.send(method, params, session_id).await?;
        serde_json::from_value(value)
            .map_err(|e| BrowserError::Cdp(format!("unexpected {method} result: {e}")))
    }

    /// queue a command without waiting for the reply, usable from sync code and Drop
    pub fn send_detached(&self, method: &str, params: Value, session_id: Option<&str>) {
        let _ = self.cmd_tx.send(CdpCommand {
            method: method.into(),
            params,
            session_id: session_id.map(String::from),
            response_tx: None,
        });
    }

    pub fn subscribe(&self, session_id: &str) -> mpsc::UnboundedReceiver<CdpEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.lock().insert(session_id.to_string(), tx);
        rx
    }

    pub fn unsubscribe(&self, session_id: &str) {
        self.routes.lock().remove(session_id);
    }

    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }
}

async fn cdp_handler_loop(
    ws: WsStream,
    mut cmd_rx: mpsc::UnboundedReceiver<CdpCommand>,
    routes: SessionRoutes,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut pending: HashMap<u64, PendingTx> = HashMap::new();
    let mut next_id: u64 = 1;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                let id = next_id;
                next_id += 1;

                let msg = encode_command(id, &cmd);
                if let Some(tx) = cmd.response_tx {
                    pending.insert(id, tx);
                }
                if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }
            msg = ws_rx.next() => {
                let Some(Ok(msg)) = msg else { break };
                let Message::Text(text) = msg else { continue };
                dispatch(&text, &mut pending, &routes);
            }
        }
    }

    debug!("CDP connection closed with {} commands in flight", pending.len());
    // dropping the senders wakes every waiter and ends every event stream
    routes.lock().clear();
}

fn encode_command(id: u64, cmd: &CdpCommand) -> String {
    let mut msg = json!({
        "id": id,
        "method": cmd.method,
        "params": cmd.params,
    });
    if let Some(session_id) = &cmd.session_id {
        msg["sessionId"] = Value::String(session_id.clone());
    }
    msg.to_string()
}

fn dispatch(text: &str, pending: &mut HashMap<u64, PendingTx>, routes: &SessionRoutes) {
    let Ok(val): Result<Value, _> = serde_json::from_str(text) else {
        trace!("ignoring non-json CDP frame");
        return;
    };

    if let Some(id) = val.get("id").and_then(Value::as_u64) {
        if let Some(tx) = pending.remove(&id) {
            let reply = match val.get("error") {
                Some(err) => Err(err["message"].as_str().unwrap_or("CDP error").to_string()),
                None => Ok(val["result"].clone()),
            };
            let _ = tx.send(reply);
        }
        return;
    }

    let (Some(method), Some(session_id)) = (
        val.get("method").and_then(Value::as_str),
        val.get("sessionId").and_then(Value::as_str),
    ) else {
        return;
    };

    if let Some(tx) = routes.lock().get(session_id) {
        let _ = tx.send(CdpEvent {
            method: method.to_string(),
            params: val["params"].clone(),
        });
    }
}

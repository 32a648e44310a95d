//! Chrome DevTools Protocol Client
//!
//! Holds a WebSocket to one page target. Commands are JSON-RPC calls matched
//! to their replies by id; everything without an id is an event and is fanned
//! out to subscribers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 1024;
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum CdpError {
    #[error("CDP error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("CDP connection closed")]
    Closed,

    #[error("no reply to {0} within the command timeout")]
    Timeout(String),
}

/// A protocol event such as `Network.requestWillBeSent`.
#[derive(Debug, Clone, PartialEq)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, CdpError>>>>>;

pub struct CdpClient {
    next_id: AtomicU64,
    outgoing: mpsc::UnboundedSender<Message>,
    pending: Pending,
    events: broadcast::Sender<CdpEvent>,
    command_timeout: Duration,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl CdpClient {
    /// Attaches to a page's debugger websocket.
    pub async fn connect(ws_endpoint: &str) -> Result<Self> {
        info!(endpoint = %ws_endpoint, "Connecting to CDP websocket");
        let (stream, _) = tokio_tungstenite::connect_async(ws_endpoint)
            .await
            .with_context(|| format!("Failed to connect to {ws_endpoint}"))?;
        let (mut sink, source) = stream.split();

        let (outgoing, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let writer = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let closing = matches!(frame, Message::Close(_));
                if let Err(e) = sink.send(frame).await {
                    warn!(error = %e, "CDP write failed");
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let reader = tokio::spawn(read_loop(source, Arc::clone(&pending), events.clone()));

        Ok(Self {
            next_id: AtomicU64::new(1),
            outgoing,
            pending,
            events,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            reader,
            writer,
        })
    }

    /// Receive every event that arrives after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
        self.events.subscribe()
    }

    /// Dispatches a command and waits for its reply.
    pub async fn send_command(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let payload = json!({ "id": id, "method": method, "params": params });
        debug!(id, method, "Sending CDP command");
        if self.outgoing.send(Message::Text(payload.to_string().into())).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(CdpError::Closed.into());
        }

        match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok(reply)) => reply.with_context(|| format!("{method} failed")),
            Ok(Err(_)) => Err(CdpError::Closed.into()),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(CdpError::Timeout(method.to_string()).into())
            }
        }
    }

    pub fn close(&self) {
        let _ = self.outgoing.send(Message::Close(None));
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

#[derive(Debug, Deserialize)]
struct Incoming {
    id: Option<u64>,
    method: Option<String>,
    #[serde(default)]
    params: Value,
    result: Option<Value>,
    error: Option<ProtocolError>,
}

#[derive(Debug, Deserialize)]
struct ProtocolError {
    code: i64,
    message: String,
}

#[derive(Debug)]
enum Routed {
    Reply(u64, Result<Value, CdpError>),
    Event(CdpEvent),
}

fn route(text: &str) -> Option<Routed> {
    let incoming: Incoming = match serde_json::from_str(text) {
        Ok(incoming) => incoming,
        Err(e) => {
            warn!(error = %e, "Unparseable CDP frame");
            return None;
        }
    };
    match (incoming.id, incoming.method) {
        (Some(id), _) => {
            let reply = match incoming.error {
                Some(err) => Err(CdpError::Protocol {
                    code: err.code,
                    message: err.message,
                }),
                None => Ok(incoming.result.unwrap_or(Value::Null)),
            };
            Some(Routed::Reply(id, reply))
        }
        (None, Some(method)) => Some(Routed::Event(CdpEvent {
            method,
            params: incoming.params,
        })),
        (None, None) => None,
    }
}

async fn read_loop<S>(mut source: S, pending: Pending, events: broadcast::Sender<CdpEvent>)
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = source.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "CDP read failed");
                break;
            }
        };
        match route(text.as_str()) {
            Some(Routed::Reply(id, reply)) => {
                if let Some(tx) = pending.lock().await.remove(&id) {
                    let _ = tx.send(reply);
                }
            }
            Some(Routed::Event(event)) => {
                // No subscribers is fine.
                let _ = events.send(event);
            }
            None => {}
        }
    }

    debug!("CDP connection closed");
    for (_, tx) in pending.lock().await.drain() {
        let _ = tx.send(Err(CdpError::Closed));
    }
}

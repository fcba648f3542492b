//! Shared fixtures for the integration tests
//!
//! Provides a scripted JSON-RPC transport and an in-memory PubSub connector
//! whose server side is driven by the test.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use solrpc_client::error::TransportError;
use solrpc_client::{PubsubChannel, PubsubConnector, RpcTransport};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a test-friendly subscriber once; `RUST_LOG` selects the level
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init();
}

type Handler = dyn Fn(&str, &Value) -> Result<Value, Value> + Send + Sync;

/// Answers each JSON-RPC request through a handler keyed on the method
///
/// `Ok` becomes the `result` member, `Err` the `error` member. Batches are
/// answered element by element, in reverse order, so correlation by id is
/// exercised on every batch.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    calls: Mutex<HashMap<String, usize>>,
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ScriptedTransport")
    }
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&str, &Value) -> Result<Value, Value> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(HashMap::new()),
        })
    }

    /// How many requests for `method` were answered
    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(method)
            .copied()
            .unwrap_or_default()
    }

    fn answer(&self, request: &Value) -> Value {
        let method = request["method"].as_str().unwrap();
        *self
            .calls
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default() += 1;
        match (self.handler)(method, &request["params"]) {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }),
            Err(error) => json!({ "jsonrpc": "2.0", "id": request["id"], "error": error }),
        }
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn send(&self, payload: String) -> Result<String, TransportError> {
        let request: Value = serde_json::from_str(&payload).unwrap();
        let reply = match request {
            Value::Array(requests) => {
                Value::Array(requests.iter().rev().map(|r| self.answer(r)).collect())
            }
            single => self.answer(&single),
        };
        Ok(reply.to_string())
    }
}

/// Accepts every request and never answers
#[derive(Debug, Default)]
pub struct StalledTransport {
    sent: AtomicUsize,
}

impl StalledTransport {
    /// Requests sent so far, each still waiting for a reply
    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RpcTransport for StalledTransport {
    async fn send(&self, _payload: String) -> Result<String, TransportError> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// `{"context": {"slot": slot}, "value": value}`
pub fn with_context(slot: u64, value: Value) -> Value {
    json!({ "context": { "slot": slot }, "value": value })
}

/// The server side of one mock PubSub connection
///
/// Dropping it closes the connection as seen by the client.
#[derive(Debug)]
pub struct ServerEnd {
    requests: mpsc::UnboundedReceiver<String>,
    frames: mpsc::UnboundedSender<String>,
}

impl ServerEnd {
    /// The next request the client sent
    pub async fn next_request(&mut self) -> Value {
        let text = self.requests.recv().await.expect("client closed connection");
        serde_json::from_str(&text).unwrap()
    }

    /// Reply to request `id`
    pub fn reply(&self, id: &Value, result: Value) {
        let frame = json!({ "jsonrpc": "2.0", "id": id, "result": result });
        self.frames.send(frame.to_string()).unwrap();
    }

    /// Reject request `id`
    pub fn reject(&self, id: &Value, code: i64, message: &str) {
        let frame = json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        });
        self.frames.send(frame.to_string()).unwrap();
    }

    /// Push a notification for server subscription `subscription`
    pub fn notify(&self, method: &str, subscription: u64, result: Value) {
        let frame = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": { "subscription": subscription, "result": result }
        });
        self.frames.send(frame.to_string()).unwrap();
    }

    /// Send a raw frame
    pub fn send_raw(&self, text: &str) {
        self.frames.send(text.to_string()).unwrap();
    }

    /// Read a subscribe request, check its method and confirm it as `server_id`
    pub async fn accept(&mut self, method: &str, server_id: u64) -> Value {
        let request = self.next_request().await;
        assert_eq!(request["method"], method);
        self.reply(&request["id"], json!(server_id));
        request
    }
}

/// Hands every new connection's server side to the test
#[derive(Debug)]
pub struct MockConnector {
    connections: mpsc::UnboundedSender<ServerEnd>,
    refuse: AtomicU32,
    attempts: AtomicU32,
}

impl MockConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (connections, accepted) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            connections,
            refuse: AtomicU32::new(0),
            attempts: AtomicU32::new(0),
        });
        (connector, accepted)
    }

    /// Fail the next `count` connection attempts
    pub fn refuse_next(&self, count: u32) {
        self.refuse.store(count, Ordering::SeqCst);
    }

    /// Connection attempts so far, failed ones included
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PubsubConnector for MockConnector {
    async fn connect(&self) -> Result<PubsubChannel, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::ConnectionClosed(
                "connection refused".to_string(),
            ));
        }

        let (channel, (requests, frames)) = PubsubChannel::pair();
        self.connections
            .send(ServerEnd { requests, frames })
            .map_err(|_| TransportError::ConnectionClosed("test dropped acceptor".to_string()))?;
        Ok(channel)
    }
}

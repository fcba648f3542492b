//! JSON-RPC envelope construction and response correlation

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::timeout;

use crate::error::{ClientError, Result, RpcError, SerializationError, TransportError};
use crate::http::request::{RpcRequest, RpcResponse};
use crate::http::transport::RpcTransport;
use crate::types::common::deserialize_present;

/// JSON-RPC request structure
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: Value,
}

impl JsonRpcRequest {
    fn new(id: u64, request: &RpcRequest) -> Result<Self> {
        Ok(Self {
            jsonrpc: "2.0",
            id,
            method: request.method(),
            params: request.params()?,
        })
    }
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

fn decode<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| {
        SerializationError::JsonDeserialize {
            source,
            data: body.to_string(),
        }
        .into()
    })
}

/// Sends typed requests over an [`RpcTransport`] and correlates replies by id
///
/// Cloning is cheap; clones share the transport and the id counter, so ids
/// stay unique across every clone.
#[derive(Clone, Debug)]
pub struct RpcDispatcher {
    transport: Arc<dyn RpcTransport>,
    request_id: Arc<AtomicU64>,
    timeout: Duration,
}

impl RpcDispatcher {
    /// Create a dispatcher with a per-call timeout
    pub fn new(transport: Arc<dyn RpcTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            request_id: Arc::new(AtomicU64::new(1)),
            timeout,
        }
    }

    /// The per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the next request ID
    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn exchange(&self, payload: String) -> Result<String> {
        tracing::trace!("request: {}", payload);
        let body = timeout(self.timeout, self.transport.send(payload))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))??;
        tracing::trace!("response: {}", body);
        Ok(body)
    }

    fn resolve(request: &RpcRequest, response: JsonRpcResponse) -> Result<RpcResponse> {
        if let Some(error) = response.error {
            tracing::debug!("{} rejected: {}", request.method(), error);
            return Err(error.into());
        }
        let result = response.result.ok_or_else(|| {
            ClientError::from(SerializationError::JsonDeserialize {
                source: <serde_json::Error as serde::de::Error>::missing_field("result"),
                data: String::new(),
            })
        })?;
        Ok(request.parse_result(&result)?)
    }

    /// Send one request and wait for its response
    ///
    /// Fails with a transport error when the transport fails, no reply
    /// arrives within the timeout, or the reply carries another id.
    pub async fn call(&self, request: RpcRequest) -> Result<RpcResponse> {
        let id = self.next_request_id();
        let envelope = JsonRpcRequest::new(id, &request)?;
        let payload = serde_json::to_string(&envelope).map_err(SerializationError::JsonSerialize)?;

        let body = self.exchange(payload).await?;
        let response: JsonRpcResponse = decode(&body)?;

        match response.id {
            Some(found) if found != id => {
                return Err(TransportError::IdMismatch { expected: id, found }.into());
            }
            // Servers answer unparseable requests with a null id
            None if response.error.is_none() => {
                return Err(TransportError::MissingResponse { id }.into());
            }
            _ => {}
        }

        Self::resolve(&request, response)
    }

    /// Send several requests in one JSON-RPC batch
    ///
    /// The outer result fails only when the batch as a whole failed. Each
    /// inner result is the outcome of the request at the same position,
    /// whatever order the server answered in.
    pub async fn batch(&self, requests: Vec<RpcRequest>) -> Result<Vec<Result<RpcResponse>>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<u64> = requests.iter().map(|_| self.next_request_id()).collect();
        let envelopes = ids
            .iter()
            .zip(&requests)
            .map(|(id, request)| JsonRpcRequest::new(*id, request))
            .collect::<Result<Vec<_>>>()?;
        let payload =
            serde_json::to_string(&envelopes).map_err(SerializationError::JsonSerialize)?;

        let body = self.exchange(payload).await?;
        let value: Value = decode(&body)?;

        // A rejected batch comes back as a single error object
        let responses: Vec<JsonRpcResponse> = match value {
            Value::Array(_) => decode(&body)?,
            _ => {
                let single: JsonRpcResponse = decode(&body)?;
                return match single.error {
                    Some(error) => Err(error.into()),
                    None => Err(ClientError::unexpected_response("array", "object")),
                };
            }
        };

        let mut by_id: HashMap<u64, JsonRpcResponse> = HashMap::with_capacity(responses.len());
        for response in responses {
            match response.id {
                Some(id) => {
                    by_id.insert(id, response);
                }
                None => tracing::warn!("dropping batch response without id"),
            }
        }

        let mut results = Vec::with_capacity(requests.len());
        for (id, request) in ids.iter().zip(&requests) {
            let response = by_id
                .remove(id)
                .ok_or(TransportError::MissingResponse { id: *id })?;
            results.push(Self::resolve(request, response));
        }
        if !by_id.is_empty() {
            tracing::warn!("ignoring {} unrequested batch responses", by_id.len());
        }
        Ok(results)
    }
}

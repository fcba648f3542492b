//! Request/response transports for JSON-RPC payloads

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::TransportError;

/// A request/response channel carrying serialized JSON-RPC envelopes
///
/// The dispatcher owns envelope construction and id correlation; a transport
/// only moves bytes and reports connection-level failures.
#[async_trait]
pub trait RpcTransport: Send + Sync + Debug {
    /// Send one serialized envelope (single or batch) and return the raw reply
    async fn send(&self, payload: String) -> Result<String, TransportError>;
}

/// HTTP transport backed by reqwest
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    auth_token: Option<String>,
}

impl HttpTransport {
    /// Create a transport posting to `endpoint`
    pub fn new(
        endpoint: Url,
        timeout: Duration,
        auth_token: Option<String>,
    ) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            auth_token,
        })
    }

    /// The endpoint requests are posted to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, payload: String) -> Result<String, TransportError> {
        let mut request_builder = self
            .client
            .post(self.endpoint.as_str())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload);

        if let Some(ref token) = self.auth_token {
            request_builder = request_builder.bearer_auth(token);
        }

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::debug!("HTTP request to {} timed out", self.endpoint);
            }
            TransportError::Request(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("HTTP {} from {}", status, self.endpoint);
            return Err(TransportError::Http {
                status: status.as_u16(),
                message: if body.is_empty() {
                    format!("HTTP {} error", status)
                } else {
                    body
                },
            });
        }

        Ok(response.text().await?)
    }
}

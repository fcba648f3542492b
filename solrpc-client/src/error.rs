//! Error types for the RPC client
//!
//! Every fallible call returns [`ClientError`]. The variants separate the
//! three outcomes a remote call can have besides success: the request never
//! completed ([`TransportError`]), the node answered with a JSON-RPC error
//! ([`RpcError`]), or the answer did not have the expected shape
//! ([`SerializationError`]).

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use solrpc_base::TxnError;

/// Main error type for the RPC client
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request did not complete at the connection level
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The node rejected the request
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Subscription-specific errors
    #[error("Subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    /// Building or signing a transaction failed
    #[error("Transaction error: {0}")]
    Transaction(#[from] TxnError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Confirmation tracking stopped before the transaction resolved
    #[error("Confirmation tracking cancelled")]
    Cancelled,
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ClientError>;

/// Connection-level failures, all of which may succeed on retry
#[derive(Error, Debug)]
pub enum TransportError {
    /// The HTTP endpoint answered with a non-success status
    #[error("HTTP request failed with status {status}: {message}")]
    Http {
        /// The HTTP status code
        status: u16,
        /// The error message from the server
        message: String,
    },

    /// The HTTP request could not be sent or its body read
    #[error("HTTP request failed")]
    Request(#[from] reqwest::Error),

    /// The WebSocket connection failed
    #[error("WebSocket failure")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// No matching response arrived in time
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The connection closed while a request was outstanding
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Maximum reconnection attempts exceeded
    #[error("Maximum reconnection attempts ({max}) exceeded")]
    ReconnectionFailed {
        /// The maximum number of reconnection attempts
        max: u32,
    },

    /// A batch response had no entry for a request id
    #[error("No response for request {id}")]
    MissingResponse {
        /// The request id without a response
        id: u64,
    },

    /// A response carried an id other than the one requested
    #[error("Response id {found} does not match request id {expected}")]
    IdMismatch {
        /// The id that was sent
        expected: u64,
        /// The id that came back
        found: u64,
    },
}

/// A JSON-RPC error object returned by the node
#[derive(Error, Debug, Clone, PartialEq, Deserialize)]
#[error("RPC error {code}: {message}")]
pub struct RpcError {
    /// The JSON-RPC error code
    pub code: i64,
    /// The error message
    pub message: String,
    /// Additional error data
    #[serde(default)]
    pub data: Option<Value>,
}

/// Serialization/deserialization errors
#[derive(Error, Debug)]
pub enum SerializationError {
    /// JSON serialization failed
    #[error("Failed to serialize to JSON")]
    JsonSerialize(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("Failed to deserialize from JSON: {source}")]
    JsonDeserialize {
        /// The source error
        #[source]
        source: serde_json::Error,
        /// The data that failed to deserialize
        data: String,
    },

    /// The response was valid JSON for a different request
    #[error("Unexpected response: expected {expected}, got {found}")]
    UnexpectedResponse {
        /// The method whose result was expected
        expected: &'static str,
        /// The method whose result was received
        found: &'static str,
    },
}

/// Validation errors for input data
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid public key format
    #[error("Invalid public key: {0}")]
    InvalidPubkey(String),

    /// Invalid signature format
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Invalid hash format
    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    /// Invalid derivation seeds
    #[error("Invalid seeds: {0}")]
    InvalidSeeds(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Subscription-related errors
#[derive(Error, Debug)]
pub enum SubscriptionError {
    /// The subscription multiplexer has shut down
    #[error("Subscription service is closed")]
    Closed,
}

/// Helper functions for common error patterns
impl ClientError {
    /// Create a timeout error
    pub fn timeout(duration: Duration) -> Self {
        Self::Transport(TransportError::Timeout(duration))
    }

    /// Create an error for a response of the wrong kind
    pub fn unexpected_response(expected: &'static str, found: &'static str) -> Self {
        Self::Serialization(SerializationError::UnexpectedResponse { expected, found })
    }

    /// Check if error is retryable
    ///
    /// Only connection-level failures are. RPC errors are surfaced verbatim.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Get error code for JSON-RPC errors
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            Self::Rpc(RpcError { code, .. }) => Some(*code),
            _ => None,
        }
    }
}

impl From<solrpc_base::ValidationError> for ValidationError {
    fn from(base_error: solrpc_base::ValidationError) -> Self {
        match base_error {
            solrpc_base::ValidationError::InvalidPubkey(s) => ValidationError::InvalidPubkey(s),
            solrpc_base::ValidationError::InvalidSignature(s) => {
                ValidationError::InvalidSignature(s)
            }
            solrpc_base::ValidationError::InvalidHash(s) => ValidationError::InvalidHash(s),
            solrpc_base::ValidationError::InvalidSeeds(s) => ValidationError::InvalidSeeds(s),
        }
    }
}

impl From<solrpc_base::ValidationError> for ClientError {
    fn from(base_error: solrpc_base::ValidationError) -> Self {
        ClientError::Validation(base_error.into())
    }
}

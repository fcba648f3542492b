//! Transaction-related types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{CommitmentLevel, Response};

/// Configuration for sendTransaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionConfig {
    /// Skip the preflight simulation
    pub skip_preflight: bool,
    /// Commitment level for the preflight simulation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preflight_commitment: Option<CommitmentLevel>,
    /// Encoding of the transaction payload, always base64
    encoding: &'static str,
    /// Maximum number of times the node retries sending to the leader
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<usize>,
    /// Minimum slot the node must have reached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_context_slot: Option<u64>,
}

impl Default for SendTransactionConfig {
    fn default() -> Self {
        Self {
            skip_preflight: false,
            preflight_commitment: None,
            encoding: "base64",
            max_retries: None,
            min_context_slot: None,
        }
    }
}

impl SendTransactionConfig {
    /// Config simulating the transaction at `commitment` before sending
    pub fn with_preflight_commitment(commitment: CommitmentLevel) -> Self {
        Self {
            preflight_commitment: Some(commitment),
            ..Default::default()
        }
    }
}

/// Status of a transaction from getSignatureStatuses
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransactionStatus {
    /// The slot the transaction was processed in
    pub slot: u64,
    /// Blocks since confirmation, `None` once rooted
    pub confirmations: Option<usize>,
    /// The execution error, if any
    pub err: Option<Value>,
    /// Legacy status object
    #[serde(default)]
    pub status: Option<Value>,
    /// The cluster confirmation level
    #[serde(default)]
    pub confirmation_status: Option<CommitmentLevel>,
}

impl TransactionStatus {
    /// The commitment this status represents
    ///
    /// Nodes that predate `confirmationStatus` signal rooted transactions with
    /// a null `confirmations`; anything else is only known to be processed.
    pub fn commitment(&self) -> CommitmentLevel {
        match (self.confirmation_status, self.confirmations) {
            (Some(level), _) => level,
            (None, None) => CommitmentLevel::Finalized,
            (None, Some(_)) => CommitmentLevel::Processed,
        }
    }
}

/// Value of a signatureSubscribe notification
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SignatureResult {
    /// The transaction was processed, with its execution error if any
    Processed {
        /// The execution error, if any
        err: Option<Value>,
    },
    /// The node received the signature, sent only when requested
    Received(String),
}

/// Signature status notification
pub type SignatureNotification = Response<SignatureResult>;

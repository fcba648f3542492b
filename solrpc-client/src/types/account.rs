//! Account-related types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use solrpc_base::{Pubkey, Signature};

use crate::types::common::{CommitmentLevel, Response, deserialize_base64_data};

/// Account information
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// The balance of the account in lamports
    pub lamports: u64,
    /// The program that owns the account
    pub owner: Pubkey,
    /// The account data
    #[serde(deserialize_with = "deserialize_base64_data")]
    pub data: Vec<u8>,
    /// Whether the account holds a program
    pub executable: bool,
    /// The epoch at which the account next owes rent
    pub rent_epoch: u64,
    /// The allocated data size
    #[serde(default)]
    pub space: Option<u64>,
}

/// A byte range of account data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataSlice {
    /// Byte offset to start at
    pub offset: usize,
    /// Number of bytes to return
    pub length: usize,
}

/// Configuration for account info requests and subscriptions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfoConfig {
    encoding: &'static str,
    /// The commitment to read at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<CommitmentLevel>,
    /// The data slice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_slice: Option<DataSlice>,
}

impl Default for AccountInfoConfig {
    fn default() -> Self {
        Self {
            encoding: "base64",
            commitment: None,
            data_slice: None,
        }
    }
}

impl AccountInfoConfig {
    /// Config reading at the given commitment
    pub fn with_commitment(commitment: CommitmentLevel) -> Self {
        Self {
            commitment: Some(commitment),
            ..Default::default()
        }
    }
}

/// Account notification from WebSocket subscription
pub type AccountNotification = Response<Account>;

/// Transaction logs from logsSubscribe
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Logs {
    /// The transaction signature
    pub signature: Signature,
    /// The execution error, if any
    pub err: Option<Value>,
    /// The log lines emitted during execution
    pub logs: Vec<String>,
}

/// Logs notification from WebSocket subscription
pub type LogsNotification = Response<Logs>;

/// Which transactions a logs subscription reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogsFilter {
    /// All transactions except simple votes
    All,
    /// All transactions including simple votes
    AllWithVotes,
    /// Transactions that mention the account
    Mentions(Pubkey),
}

impl Serialize for LogsFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str("all"),
            Self::AllWithVotes => serializer.serialize_str("allWithVotes"),
            Self::Mentions(pubkey) => {
                #[derive(Serialize)]
                struct Mentions {
                    mentions: [String; 1],
                }
                Mentions {
                    mentions: [pubkey.to_string()],
                }
                .serialize(serializer)
            }
        }
    }
}

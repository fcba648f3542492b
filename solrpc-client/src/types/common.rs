//! Common types used across the client

use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};

use solrpc_base::Hash;

/// Commitment level
///
/// Levels are ordered: a transaction confirmed at one level is also
/// confirmed at every level below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentLevel {
    /// Included in a block processed by the node
    Processed,
    /// Voted on by a supermajority of the cluster
    Confirmed,
    /// Rooted by a supermajority of the cluster
    Finalized,
}

impl Default for CommitmentLevel {
    fn default() -> Self {
        Self::Finalized
    }
}

impl std::fmt::Display for CommitmentLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// The `{"commitment": ...}` configuration object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentConfig {
    /// The requested commitment level
    pub commitment: CommitmentLevel,
}

impl From<CommitmentLevel> for CommitmentConfig {
    fn from(commitment: CommitmentLevel) -> Self {
        Self { commitment }
    }
}

/// Response context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseContext {
    /// The slot at which the node evaluated the request
    pub slot: u64,
    /// The RPC API version of the node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// A value paired with the context it was read at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response<T> {
    /// The context of the response
    pub context: ResponseContext,
    /// The response value
    pub value: T,
}

/// Result of getLatestBlockhash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestBlockhash {
    /// The blockhash
    pub blockhash: Hash,
    /// The last block height at which the blockhash is valid
    pub last_valid_block_height: u64,
}

/// Version information for the RPC node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// The node software version
    #[serde(rename = "solana-core")]
    pub solana_core: String,
    /// The feature set identifier
    #[serde(rename = "feature-set", default)]
    pub feature_set: Option<u32>,
}

/// Slot notification from slotSubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    /// The parent slot
    pub parent: u64,
    /// The current root slot
    pub root: u64,
    /// The newly processed slot
    pub slot: u64,
}

/// Deserialize the `["<data>", "base64"]` pair used for binary payloads
pub(crate) fn deserialize_base64_data<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let (data, encoding) = <(String, String)>::deserialize(deserializer)?;
    if encoding != "base64" {
        return Err(serde::de::Error::custom(format!(
            "unsupported data encoding: {}",
            encoding
        )));
    }
    base64::engine::general_purpose::STANDARD
        .decode(&data)
        .map_err(serde::de::Error::custom)
}

/// Deserialize a field that is present but may be `null` into `Some(Value::Null)`
pub(crate) fn deserialize_present<'de, D>(
    deserializer: D,
) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

//! The closed set of supported RPC methods and their typed results

use serde::Deserialize;
use serde_json::{Value, json};
use solrpc_base::{Pubkey, Signature};

use crate::error::SerializationError;
use crate::types::{
    Account, AccountInfoConfig, CommitmentConfig, CommitmentLevel, LatestBlockhash, Response,
    SendTransactionConfig, TransactionStatus, Version,
};

/// A JSON-RPC method call with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum RpcRequest {
    /// `getLatestBlockhash`
    GetLatestBlockhash {
        /// The commitment to read at
        commitment: Option<CommitmentLevel>,
    },
    /// `getBlockHeight`
    GetBlockHeight {
        /// The commitment to read at
        commitment: Option<CommitmentLevel>,
    },
    /// `getSignatureStatuses`
    GetSignatureStatuses {
        /// Signatures to look up
        signatures: Vec<Signature>,
        /// Search beyond the node's recent status cache
        search_transaction_history: bool,
    },
    /// `sendTransaction`
    SendTransaction {
        /// The base64-encoded signed transaction
        transaction: String,
        /// Submission options
        config: SendTransactionConfig,
    },
    /// `getBalance`
    GetBalance {
        /// The account to query
        pubkey: Pubkey,
        /// The commitment to read at
        commitment: Option<CommitmentLevel>,
    },
    /// `getAccountInfo`
    GetAccountInfo {
        /// The account to query
        pubkey: Pubkey,
        /// Encoding and slice options
        config: AccountInfoConfig,
    },
    /// `getSlot`
    GetSlot {
        /// The commitment to read at
        commitment: Option<CommitmentLevel>,
    },
    /// `getVersion`
    GetVersion,
    /// `getHealth`
    GetHealth,
    /// `requestAirdrop`
    RequestAirdrop {
        /// The account to fund
        pubkey: Pubkey,
        /// Amount in lamports
        lamports: u64,
        /// The commitment to read at
        commitment: Option<CommitmentLevel>,
    },
}

/// The typed result of an [`RpcRequest`]
#[derive(Debug, Clone, PartialEq)]
pub enum RpcResponse {
    /// Result of `getLatestBlockhash`
    LatestBlockhash(Response<LatestBlockhash>),
    /// Result of `getBlockHeight`
    BlockHeight(u64),
    /// Result of `getSignatureStatuses`, one entry per requested signature
    SignatureStatuses(Response<Vec<Option<TransactionStatus>>>),
    /// Result of `sendTransaction` and `requestAirdrop`
    Signature(Signature),
    /// Result of `getBalance`
    Balance(Response<u64>),
    /// Result of `getAccountInfo`
    AccountInfo(Response<Option<Account>>),
    /// Result of `getSlot`
    Slot(u64),
    /// Result of `getVersion`
    Version(Version),
    /// Result of `getHealth`
    Health(String),
}

fn commitment_params(commitment: Option<CommitmentLevel>) -> Vec<Value> {
    commitment
        .map(|c| json!(CommitmentConfig::from(c)))
        .into_iter()
        .collect()
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, SerializationError> {
    serde_json::to_value(value).map_err(SerializationError::JsonSerialize)
}

fn parse<T: for<'de> Deserialize<'de>>(result: &Value) -> Result<T, SerializationError> {
    T::deserialize(result).map_err(|source| SerializationError::JsonDeserialize {
        source,
        data: result.to_string(),
    })
}

impl RpcRequest {
    /// The JSON-RPC method name
    pub fn method(&self) -> &'static str {
        match self {
            Self::GetLatestBlockhash { .. } => "getLatestBlockhash",
            Self::GetBlockHeight { .. } => "getBlockHeight",
            Self::GetSignatureStatuses { .. } => "getSignatureStatuses",
            Self::SendTransaction { .. } => "sendTransaction",
            Self::GetBalance { .. } => "getBalance",
            Self::GetAccountInfo { .. } => "getAccountInfo",
            Self::GetSlot { .. } => "getSlot",
            Self::GetVersion => "getVersion",
            Self::GetHealth => "getHealth",
            Self::RequestAirdrop { .. } => "requestAirdrop",
        }
    }

    /// The positional parameter array
    pub fn params(&self) -> Result<Value, SerializationError> {
        let params = match self {
            Self::GetLatestBlockhash { commitment }
            | Self::GetBlockHeight { commitment }
            | Self::GetSlot { commitment } => commitment_params(*commitment),
            Self::GetSignatureStatuses {
                signatures,
                search_transaction_history,
            } => vec![
                to_value(signatures)?,
                json!({ "searchTransactionHistory": search_transaction_history }),
            ],
            Self::SendTransaction {
                transaction,
                config,
            } => vec![json!(transaction), to_value(config)?],
            Self::GetBalance { pubkey, commitment } => {
                let mut params = vec![json!(pubkey.to_string())];
                params.extend(commitment_params(*commitment));
                params
            }
            Self::GetAccountInfo { pubkey, config } => {
                vec![json!(pubkey.to_string()), to_value(config)?]
            }
            Self::GetVersion | Self::GetHealth => Vec::new(),
            Self::RequestAirdrop {
                pubkey,
                lamports,
                commitment,
            } => {
                let mut params = vec![json!(pubkey.to_string()), json!(lamports)];
                params.extend(commitment_params(*commitment));
                params
            }
        };
        Ok(Value::Array(params))
    }

    /// Parse the `result` member of a successful response
    ///
    /// Missing or mistyped fields fail here rather than surfacing later.
    pub fn parse_result(&self, result: &Value) -> Result<RpcResponse, SerializationError> {
        Ok(match self {
            Self::GetLatestBlockhash { .. } => RpcResponse::LatestBlockhash(parse(result)?),
            Self::GetBlockHeight { .. } => RpcResponse::BlockHeight(parse(result)?),
            Self::GetSignatureStatuses { .. } => RpcResponse::SignatureStatuses(parse(result)?),
            Self::SendTransaction { .. } | Self::RequestAirdrop { .. } => {
                RpcResponse::Signature(parse(result)?)
            }
            Self::GetBalance { .. } => RpcResponse::Balance(parse(result)?),
            Self::GetAccountInfo { .. } => RpcResponse::AccountInfo(parse(result)?),
            Self::GetSlot { .. } => RpcResponse::Slot(parse(result)?),
            Self::GetVersion => RpcResponse::Version(parse(result)?),
            Self::GetHealth => RpcResponse::Health(parse(result)?),
        })
    }
}

impl RpcResponse {
    /// Name of the result kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LatestBlockhash(_) => "latestBlockhash",
            Self::BlockHeight(_) => "blockHeight",
            Self::SignatureStatuses(_) => "signatureStatuses",
            Self::Signature(_) => "signature",
            Self::Balance(_) => "balance",
            Self::AccountInfo(_) => "accountInfo",
            Self::Slot(_) => "slot",
            Self::Version(_) => "version",
            Self::Health(_) => "health",
        }
    }
}

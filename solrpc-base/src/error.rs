//! Error types for message compilation, encoding and signing

use thiserror::Error;

use crate::pubkey::Pubkey;

/// Errors raised while building, encoding or signing a transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxnError {
    /// The input bytes do not form a valid encoding
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    /// The message references more accounts than an index byte can address
    #[error("too many accounts: {count} exceeds maximum {max_count}")]
    TooManyAccounts { count: usize, max_count: usize },

    /// Finalize was attempted before every required signer signed
    #[error("incomplete signatures: {present} of {required} present")]
    IncompleteSignatures {
        present: usize,
        required: usize,
        missing: Vec<Pubkey>,
    },

    /// A signature was supplied for a key that is not a required signer
    #[error("unknown signer: {0}")]
    UnknownSigner(Pubkey),

    /// A supplied signature does not verify against the message
    #[error("invalid signature for signer {0}")]
    InvalidSignature(Pubkey),

    /// The serialized transaction exceeds the packet limit
    #[error("transaction size {size} exceeds maximum allowed size {max_size}")]
    TransactionTooLarge { size: usize, max_size: usize },

    /// Instruction data does not fit a compact-u16 length prefix
    #[error("instruction data of {len} bytes exceeds maximum {max_len}")]
    InstructionDataTooLarge { len: usize, max_len: usize },

    /// A message needs at least one instruction
    #[error("no instructions provided")]
    NoInstructions,

    /// Keypair bytes are malformed or inconsistent
    #[error("invalid keypair: {0}")]
    InvalidKeypair(String),
}

impl TxnError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEncoding(msg.into())
    }
}

/// Errors raised while parsing textual keys, hashes and signatures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid public key: {0}")]
    InvalidPubkey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Invalid seeds: {0}")]
    InvalidSeeds(String),
}

pub type Result<T> = std::result::Result<T, TxnError>;

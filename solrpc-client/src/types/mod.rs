//! Data types for the RPC client

pub mod account;
pub mod common;
pub mod transaction;

// Re-export commonly used types
pub use account::{
    Account, AccountInfoConfig, AccountNotification, DataSlice, Logs, LogsFilter,
    LogsNotification,
};
pub use common::{
    CommitmentConfig, CommitmentLevel, LatestBlockhash, Response, ResponseContext, SlotInfo,
    Version,
};
pub use transaction::{
    SendTransactionConfig, SignatureNotification, SignatureResult, TransactionStatus,
};

//! Async client for Solana-compatible JSON-RPC and PubSub APIs
//!
//! The crate submits transactions built with `solrpc-base` and tracks them
//! to a target commitment, combining status polls with signature
//! subscriptions multiplexed over a single WebSocket connection.
//!
//! # Example
//!
//! ```no_run
//! use solrpc_client::{Client, CommitmentLevel, Keypair, Signer, Transaction};
//! use solrpc_client::solrpc_base::{Message, system_program};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .http_endpoint(url::Url::parse("http://localhost:8899")?)
//!         .ws_endpoint(Some(url::Url::parse("ws://localhost:8900")?))
//!         .commitment(CommitmentLevel::Confirmed)
//!         .build()?;
//!
//!     let payer = Keypair::generate()?;
//!     let recipient = Keypair::generate()?.pubkey();
//!     let blockhash = client.get_latest_blockhash().await?;
//!
//!     let instruction = system_program::transfer(&payer.pubkey(), &recipient, 1_000);
//!     let message = Message::compile(&payer.pubkey(), &[instruction], blockhash.blockhash)?;
//!     let transaction = Transaction::new(message)?.sign(&[&payer])?;
//!
//!     let outcome = client.send_and_confirm_transaction(&transaction, None).await?;
//!     println!("Outcome: {:?}", outcome);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod blockhash;
pub mod blocking;
pub mod client;
pub mod confirmation;
pub mod error;
pub mod http;
pub mod types;
pub mod websocket;

pub use solrpc_base;

// Re-export main types and traits
pub use blocking::BlockingClient;
pub use client::{Client, ClientBuilder, ClientConfig};
pub use confirmation::{
    ConfirmationConfig, ConfirmationStatus, ConfirmationTracker, Outcome, PendingConfirmation,
};
pub use error::{ClientError, Result};
pub use http::{HttpTransport, RpcDispatcher, RpcRequest, RpcResponse, RpcTransport};

// Re-export base types for convenience
pub use solrpc_base::{Hash, Keypair, Pubkey, Signature, SignedTransaction, Signer, Transaction};
pub use types::{
    Account, AccountInfoConfig, AccountNotification, CommitmentLevel, LatestBlockhash, Logs,
    LogsFilter, LogsNotification, SendTransactionConfig, SignatureNotification, SignatureResult,
    SlotInfo, TransactionStatus, Version,
};

// Re-export WebSocket types
pub use websocket::{
    PubsubChannel, PubsubConnector, ReconnectPolicy, Subscription, SubscriptionHandle,
    SubscriptionKind, SubscriptionMultiplexer, WsConnector,
};

/// Get the version of this client library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

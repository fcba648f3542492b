//! Synchronous client
//!
//! A thin adapter that drives the async [`Client`] on an owned
//! current-thread runtime. Background work (confirmation drivers, the
//! subscription actor) only makes progress while a call is running, so
//! subscriptions are not exposed here.

use std::sync::Arc;

use solrpc_base::{Pubkey, Signature, SignedTransaction};
use tokio::runtime::{Builder, Runtime};

use crate::client::{Client, ClientConfig};
use crate::confirmation::Outcome;
use crate::error::{ClientError, Result};
use crate::http::RpcTransport;
use crate::types::{
    Account, AccountInfoConfig, CommitmentLevel, LatestBlockhash, TransactionStatus, Version,
};

/// Blocking RPC client
#[derive(Debug)]
pub struct BlockingClient {
    client: Client,
    runtime: Runtime,
}

fn runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ClientError::Configuration(format!("failed to start runtime: {}", e)))
}

impl BlockingClient {
    /// Create a blocking client with the HTTP transport
    ///
    /// Must not be called from within an async runtime.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let runtime = runtime()?;
        let client = Client::new(config)?;
        Ok(Self { client, runtime })
    }

    /// Create a blocking client over a custom transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn RpcTransport>) -> Result<Self> {
        let runtime = runtime()?;
        let client = Client::with_transports(config, transport, None);
        Ok(Self { client, runtime })
    }

    /// The async client driven by this adapter
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Submit a signed transaction
    pub fn send_transaction(&self, transaction: &SignedTransaction) -> Result<Signature> {
        self.runtime.block_on(self.client.send_transaction(transaction))
    }

    /// Submit a signed transaction and wait until it reaches `commitment`
    pub fn send_and_confirm_transaction(
        &self,
        transaction: &SignedTransaction,
        commitment: Option<CommitmentLevel>,
    ) -> Result<Outcome> {
        self.runtime.block_on(self.client.send_and_confirm_transaction(transaction, commitment))
    }

    /// Wait until an already submitted transaction reaches `commitment`
    pub fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: Option<CommitmentLevel>,
        last_valid_block_height: Option<u64>,
    ) -> Result<Outcome> {
        self.runtime.block_on(self.client.confirm_transaction(
            signature,
            commitment,
            last_valid_block_height,
        ))
    }

    /// Get a recent blockhash
    pub fn get_latest_blockhash(&self) -> Result<LatestBlockhash> {
        self.runtime.block_on(self.client.get_latest_blockhash())
    }

    /// Get the status of each signature
    pub fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<TransactionStatus>>> {
        self.runtime.block_on(self.client.get_signature_statuses(signatures))
    }

    /// Get the current block height
    pub fn get_block_height(&self) -> Result<u64> {
        self.runtime.block_on(self.client.get_block_height())
    }

    /// Get account balance in lamports
    pub fn get_balance(&self, pubkey: &Pubkey) -> Result<u64> {
        self.runtime.block_on(self.client.get_balance(pubkey))
    }

    /// Get account information
    pub fn get_account_info(
        &self,
        pubkey: &Pubkey,
        config: Option<AccountInfoConfig>,
    ) -> Result<Option<Account>> {
        self.runtime.block_on(self.client.get_account_info(pubkey, config))
    }

    /// Get the current slot
    pub fn get_slot(&self) -> Result<u64> {
        self.runtime.block_on(self.client.get_slot())
    }

    /// Get version information
    pub fn get_version(&self) -> Result<Version> {
        self.runtime.block_on(self.client.get_version())
    }

    /// Get health status
    pub fn get_health(&self) -> Result<String> {
        self.runtime.block_on(self.client.get_health())
    }

    /// Request an airdrop
    pub fn request_airdrop(&self, pubkey: &Pubkey, lamports: u64) -> Result<Signature> {
        self.runtime.block_on(self.client.request_airdrop(pubkey, lamports))
    }
}

//! Main client implementation

use std::sync::Arc;
use std::time::Duration;

use solrpc_base::{Pubkey, Signature, SignedTransaction};
use tokio::sync::RwLock;
use url::Url;

use crate::blockhash::BlockhashCache;
use crate::confirmation::{ConfirmationConfig, ConfirmationTracker, Outcome};
use crate::error::{ClientError, Result, ValidationError};
use crate::http::{HttpTransport, RpcDispatcher, RpcRequest, RpcResponse, RpcTransport};
use crate::types::{
    Account, AccountInfoConfig, CommitmentLevel, LatestBlockhash, SendTransactionConfig,
    TransactionStatus, Version,
};
use crate::websocket::{PubsubConnector, ReconnectPolicy, SubscriptionMultiplexer, WsConnector};

/// Configuration for the RPC client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// HTTP endpoint for RPC calls
    pub http_endpoint: Url,
    /// WebSocket endpoint for subscriptions (optional)
    pub ws_endpoint: Option<Url>,
    /// Request timeout, for HTTP calls and subscription requests alike
    pub timeout: Duration,
    /// Commitment used when a call does not name one
    pub commitment: CommitmentLevel,
    /// Optional bearer token sent on HTTP and WebSocket connections
    pub auth_token: Option<String>,
    /// WebSocket reconnection policy
    pub reconnect: ReconnectPolicy,
    /// Confirmation polling and timeout
    pub confirmation: ConfirmationConfig,
    /// How long a fetched blockhash is reused; `None` always fetches
    pub blockhash_cache_ttl: Option<Duration>,
}

impl ClientConfig {
    /// Configuration for `http_endpoint` with default settings
    pub fn new(http_endpoint: Url) -> Self {
        Self {
            http_endpoint,
            ws_endpoint: None,
            timeout: Duration::from_secs(30),
            commitment: CommitmentLevel::default(),
            auth_token: None,
            reconnect: ReconnectPolicy::default(),
            confirmation: ConfirmationConfig::default(),
            blockhash_cache_ttl: None,
        }
    }
}

/// Builder for creating a configured RPC client
#[derive(Debug, Default)]
pub struct ClientBuilder {
    http_endpoint: Option<Url>,
    ws_endpoint: Option<Url>,
    timeout: Option<Duration>,
    commitment: Option<CommitmentLevel>,
    auth_token: Option<String>,
    reconnect: Option<ReconnectPolicy>,
    confirmation: Option<ConfirmationConfig>,
    blockhash_cache_ttl: Option<Duration>,
}

impl ClientBuilder {
    /// Create a new client builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP endpoint
    pub fn http_endpoint(mut self, url: Url) -> Self {
        self.http_endpoint = Some(url);
        self
    }

    /// Set the WebSocket endpoint
    pub fn ws_endpoint(mut self, url: Option<Url>) -> Self {
        self.ws_endpoint = url;
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the default commitment
    pub fn commitment(mut self, commitment: CommitmentLevel) -> Self {
        self.commitment = Some(commitment);
        self
    }

    /// Set authorization token
    pub fn auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    /// Set the WebSocket reconnection policy
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = Some(policy);
        self
    }

    /// Set confirmation polling and timeout
    pub fn confirmation(mut self, config: ConfirmationConfig) -> Self {
        self.confirmation = Some(config);
        self
    }

    /// Reuse fetched blockhashes for `ttl`
    pub fn blockhash_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.blockhash_cache_ttl = ttl;
        self
    }

    /// Assemble the configuration without connecting
    pub fn config(self) -> Result<ClientConfig> {
        let http_endpoint = self.http_endpoint.ok_or_else(|| {
            ValidationError::InvalidConfig("HTTP endpoint not configured".to_string())
        })?;
        let mut config = ClientConfig::new(http_endpoint);
        config.ws_endpoint = self.ws_endpoint;
        config.auth_token = self.auth_token;
        config.blockhash_cache_ttl = self.blockhash_cache_ttl;
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(commitment) = self.commitment {
            config.commitment = commitment;
        }
        if let Some(reconnect) = self.reconnect {
            config.reconnect = reconnect;
        }
        if let Some(confirmation) = self.confirmation {
            config.confirmation = confirmation;
        }
        Ok(config)
    }

    /// Build the client
    pub fn build(self) -> Result<Client> {
        Client::new(self.config()?)
    }
}

/// Main RPC client
///
/// Cheap to clone; clones share the dispatcher, the blockhash cache and the
/// subscription connection.
#[derive(Clone, Debug)]
pub struct Client {
    config: ClientConfig,
    dispatcher: RpcDispatcher,
    blockhashes: Arc<BlockhashCache>,
    connector: Option<Arc<dyn PubsubConnector>>,
    multiplexer: Arc<RwLock<Option<SubscriptionMultiplexer>>>,
}

impl Client {
    /// Create a new client with the HTTP and WebSocket transports
    pub fn new(config: ClientConfig) -> Result<Self> {
        tracing::info!("Creating new client for {}", config.http_endpoint);
        let transport = HttpTransport::new(
            config.http_endpoint.clone(),
            config.timeout,
            config.auth_token.clone(),
        )?;
        let connector = config.ws_endpoint.clone().map(|url| {
            Arc::new(WsConnector::new(url, config.auth_token.clone())) as Arc<dyn PubsubConnector>
        });
        Ok(Self::with_transports(config, Arc::new(transport), connector))
    }

    /// Create a client over custom transports
    pub fn with_transports(
        config: ClientConfig,
        transport: Arc<dyn RpcTransport>,
        connector: Option<Arc<dyn PubsubConnector>>,
    ) -> Self {
        let dispatcher = RpcDispatcher::new(transport, config.timeout);
        let blockhashes = Arc::new(BlockhashCache::new(
            config.blockhash_cache_ttl.unwrap_or(Duration::ZERO),
        ));
        Self {
            config,
            dispatcher,
            blockhashes,
            connector,
            multiplexer: Arc::new(RwLock::new(None)),
        }
    }

    /// Create a client builder
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the request dispatcher
    pub fn dispatcher(&self) -> &RpcDispatcher {
        &self.dispatcher
    }

    /// Get the blockhash cache
    pub fn blockhashes(&self) -> &BlockhashCache {
        &self.blockhashes
    }

    /// Get or create the subscription multiplexer (lazy initialization)
    ///
    /// A multiplexer that gave up reconnecting is replaced by a new one.
    pub async fn subscriptions(&self) -> Result<SubscriptionMultiplexer> {
        let connector = self.connector.clone().ok_or_else(|| {
            ValidationError::InvalidConfig("WebSocket endpoint not configured".to_string())
        })?;

        {
            let multiplexer = self.multiplexer.read().await;
            if let Some(existing) = multiplexer.as_ref().filter(|m| !m.is_terminated()) {
                return Ok(existing.clone());
            }
        }

        // Check again in case another task connected meanwhile
        let mut multiplexer = self.multiplexer.write().await;
        if let Some(existing) = multiplexer.as_ref().filter(|m| !m.is_terminated()) {
            return Ok(existing.clone());
        }
        let created = SubscriptionMultiplexer::connect(
            connector,
            self.config.reconnect.clone(),
            self.config.timeout,
        )
        .await?;
        *multiplexer = Some(created.clone());
        Ok(created)
    }

    /// Check if a subscription connection is open
    pub async fn has_subscriptions(&self) -> bool {
        self.multiplexer
            .read()
            .await
            .as_ref()
            .is_some_and(|m| !m.is_terminated())
    }

    /// Release the client's handle on the subscription connection
    ///
    /// The connection closes once every subscription is dropped as well.
    pub async fn close_subscriptions(&self) {
        *self.multiplexer.write().await = None;
    }

    /// A confirmation tracker, push-assisted when a WebSocket endpoint is configured
    pub async fn confirmation_tracker(&self) -> ConfirmationTracker {
        let tracker =
            ConfirmationTracker::new(self.dispatcher.clone(), self.config.confirmation.clone());
        if self.connector.is_none() {
            return tracker;
        }
        match self.subscriptions().await {
            Ok(multiplexer) => tracker.with_subscriptions(multiplexer),
            Err(e) => {
                tracing::warn!("Subscriptions unavailable, confirming by polling: {}", e);
                tracker
            }
        }
    }

    async fn call<T>(
        &self,
        request: RpcRequest,
        extract: fn(RpcResponse) -> std::result::Result<T, RpcResponse>,
    ) -> Result<T> {
        let expected = request.method();
        let response = self.dispatcher.call(request).await?;
        extract(response).map_err(|other| ClientError::unexpected_response(expected, other.kind()))
    }

    fn commitment(&self, commitment: Option<CommitmentLevel>) -> CommitmentLevel {
        commitment.unwrap_or(self.config.commitment)
    }
}

impl Client {
    /// Submit a signed transaction
    pub async fn send_transaction(&self, transaction: &SignedTransaction) -> Result<Signature> {
        let config = SendTransactionConfig::with_preflight_commitment(self.config.commitment);
        self.send_transaction_with_config(transaction, config).await
    }

    /// Submit a signed transaction with explicit options
    pub async fn send_transaction_with_config(
        &self,
        transaction: &SignedTransaction,
        config: SendTransactionConfig,
    ) -> Result<Signature> {
        let request = RpcRequest::SendTransaction {
            transaction: transaction.to_base64(),
            config,
        };
        let signature = self
            .call(request, |r| match r {
                RpcResponse::Signature(signature) => Ok(signature),
                other => Err(other),
            })
            .await?;
        if signature != *transaction.signature() {
            tracing::warn!(
                "Node returned signature {} for transaction {}",
                signature,
                transaction.signature()
            );
        }
        self.blockhashes
            .mark_used(&transaction.message().recent_blockhash)
            .await;
        Ok(signature)
    }

    /// Submit a signed transaction and wait until it reaches `commitment`
    ///
    /// Expiry is detected when the transaction's blockhash was fetched
    /// through this client; otherwise only the confirmation timeout applies.
    pub async fn send_and_confirm_transaction(
        &self,
        transaction: &SignedTransaction,
        commitment: Option<CommitmentLevel>,
    ) -> Result<Outcome> {
        let signature = self.send_transaction(transaction).await?;
        let last_valid_block_height = self
            .blockhashes
            .last_valid_block_height(&transaction.message().recent_blockhash)
            .await;
        self.confirm_transaction(&signature, commitment, last_valid_block_height)
            .await
    }

    /// Wait until an already submitted transaction reaches `commitment`
    pub async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: Option<CommitmentLevel>,
        last_valid_block_height: Option<u64>,
    ) -> Result<Outcome> {
        let tracker = self.confirmation_tracker().await;
        let pending = tracker.track(
            *signature,
            self.commitment(commitment),
            last_valid_block_height,
        );
        pending.wait().await.ok_or(ClientError::Cancelled)
    }

    /// Get a recent blockhash, from the cache when fresh
    pub async fn get_latest_blockhash(&self) -> Result<LatestBlockhash> {
        if let Some(cached) = self.blockhashes.latest().await {
            return Ok(cached);
        }
        self.fetch_latest_blockhash().await
    }

    /// Get a recent blockhash no transaction was sent with through this client
    pub async fn get_unused_blockhash(&self) -> Result<LatestBlockhash> {
        if let Some(cached) = self.blockhashes.latest_unused().await {
            return Ok(cached);
        }
        self.fetch_latest_blockhash().await
    }

    async fn fetch_latest_blockhash(&self) -> Result<LatestBlockhash> {
        let request = RpcRequest::GetLatestBlockhash {
            commitment: Some(self.config.commitment),
        };
        let response = self
            .call(request, |r| match r {
                RpcResponse::LatestBlockhash(response) => Ok(response),
                other => Err(other),
            })
            .await?;
        self.blockhashes
            .insert(response.context.slot, response.value)
            .await;
        Ok(response.value)
    }

    /// Get the status of each signature, `None` for unknown ones
    pub async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<TransactionStatus>>> {
        let request = RpcRequest::GetSignatureStatuses {
            signatures: signatures.to_vec(),
            search_transaction_history: false,
        };
        let response = self
            .call(request, |r| match r {
                RpcResponse::SignatureStatuses(response) => Ok(response),
                other => Err(other),
            })
            .await?;
        Ok(response.value)
    }

    /// Get the current block height
    pub async fn get_block_height(&self) -> Result<u64> {
        let request = RpcRequest::GetBlockHeight {
            commitment: Some(self.config.commitment),
        };
        self.call(request, |r| match r {
            RpcResponse::BlockHeight(height) => Ok(height),
            other => Err(other),
        })
        .await
    }

    /// Get account balance in lamports
    pub async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64> {
        let request = RpcRequest::GetBalance {
            pubkey: *pubkey,
            commitment: Some(self.config.commitment),
        };
        let response = self
            .call(request, |r| match r {
                RpcResponse::Balance(response) => Ok(response),
                other => Err(other),
            })
            .await?;
        Ok(response.value)
    }

    /// Get account information, `None` if the account does not exist
    pub async fn get_account_info(
        &self,
        pubkey: &Pubkey,
        config: Option<AccountInfoConfig>,
    ) -> Result<Option<Account>> {
        let config = config
            .unwrap_or_else(|| AccountInfoConfig::with_commitment(self.config.commitment));
        let request = RpcRequest::GetAccountInfo {
            pubkey: *pubkey,
            config,
        };
        let response = self
            .call(request, |r| match r {
                RpcResponse::AccountInfo(response) => Ok(response),
                other => Err(other),
            })
            .await?;
        Ok(response.value)
    }

    /// Get the current slot
    pub async fn get_slot(&self) -> Result<u64> {
        let request = RpcRequest::GetSlot {
            commitment: Some(self.config.commitment),
        };
        self.call(request, |r| match r {
            RpcResponse::Slot(slot) => Ok(slot),
            other => Err(other),
        })
        .await
    }

    /// Get version information
    pub async fn get_version(&self) -> Result<Version> {
        self.call(RpcRequest::GetVersion, |r| match r {
            RpcResponse::Version(version) => Ok(version),
            other => Err(other),
        })
        .await
    }

    /// Get health status
    pub async fn get_health(&self) -> Result<String> {
        self.call(RpcRequest::GetHealth, |r| match r {
            RpcResponse::Health(health) => Ok(health),
            other => Err(other),
        })
        .await
    }

    /// Request an airdrop of `lamports` to `pubkey`
    pub async fn request_airdrop(&self, pubkey: &Pubkey, lamports: u64) -> Result<Signature> {
        let request = RpcRequest::RequestAirdrop {
            pubkey: *pubkey,
            lamports,
            commitment: Some(self.config.commitment),
        };
        self.call(request, |r| match r {
            RpcResponse::Signature(signature) => Ok(signature),
            other => Err(other),
        })
        .await
    }
}

//! Many logical subscriptions over one PubSub connection
//!
//! A single actor task owns the connection, the routing table and every
//! in-flight request. Handles talk to it through a command channel, so
//! registering a subscription and routing a notification for it can never
//! race.
//!
//! When the connection drops, every subscription is marked stale and the
//! actor reconnects following the [`ReconnectPolicy`]. Stale subscriptions
//! are re-issued on the new connection before their notifications resume.
//! Notifications sent during the gap are lost.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use solrpc_base::{Pubkey, Signature};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use crate::error::{
    ClientError, Result, RpcError, SerializationError, SubscriptionError, TransportError,
};
use crate::types::common::deserialize_present;
use crate::types::{
    AccountInfoConfig, AccountNotification, CommitmentConfig, CommitmentLevel, LogsFilter,
    LogsNotification, SignatureNotification, SlotInfo,
};
use crate::websocket::connection::{PubsubChannel, PubsubConnector};
use crate::websocket::handles::{Subscription, SubscriptionKey};
use crate::websocket::reconnect::ReconnectPolicy;

/// The supported notification streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    /// `signatureSubscribe`, ends after the first notification
    Signature,
    /// `accountSubscribe`
    Account,
    /// `logsSubscribe`
    Logs,
    /// `slotSubscribe`
    Slot,
}

impl SubscriptionKind {
    /// Method that opens the stream
    pub fn subscribe_method(self) -> &'static str {
        match self {
            Self::Signature => "signatureSubscribe",
            Self::Account => "accountSubscribe",
            Self::Logs => "logsSubscribe",
            Self::Slot => "slotSubscribe",
        }
    }

    /// Method that closes the stream
    pub fn unsubscribe_method(self) -> &'static str {
        match self {
            Self::Signature => "signatureUnsubscribe",
            Self::Account => "accountUnsubscribe",
            Self::Logs => "logsUnsubscribe",
            Self::Slot => "slotUnsubscribe",
        }
    }

    /// Whether the server ends the stream after one notification
    pub fn is_one_shot(self) -> bool {
        matches!(self, Self::Signature)
    }
}

pub(crate) enum Command {
    Subscribe {
        kind: SubscriptionKind,
        params: Value,
        sink: mpsc::UnboundedSender<Value>,
        reply: oneshot::Sender<Result<SubscriptionKey>>,
    },
    Unsubscribe {
        key: SubscriptionKey,
        reply: Option<oneshot::Sender<Result<bool>>>,
    },
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subscribe { kind, .. } => f.debug_struct("Subscribe").field("kind", kind).finish(),
            Self::Unsubscribe { key, .. } => f.debug_struct("Unsubscribe").field("key", key).finish(),
        }
    }
}

/// JSON-RPC notification
#[derive(Debug, Deserialize)]
struct WsNotification {
    method: String,
    params: NotificationParams,
}

/// Subscription notification parameters
#[derive(Debug, Deserialize)]
struct NotificationParams {
    subscription: u64,
    result: Value,
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
struct WsResponse {
    id: u64,
    #[serde(default, deserialize_with = "deserialize_present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

impl WsResponse {
    fn into_result<T: DeserializeOwned>(self) -> Result<T> {
        match (self.error, self.result) {
            (Some(error), _) => Err(error.into()),
            (None, Some(value)) => {
                T::deserialize(&value).map_err(|source| {
                    SerializationError::JsonDeserialize {
                        source,
                        data: value.to_string(),
                    }
                    .into()
                })
            }
            (None, None) => Err(ClientError::unexpected_response("result", "nothing")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    /// Subscribe request sent, no server id yet
    Pending,
    /// Routed by server id
    Live,
    /// Waiting for a connection to re-issue the subscribe request
    Stale,
}

struct Entry {
    kind: SubscriptionKind,
    params: Value,
    sink: mpsc::UnboundedSender<Value>,
    server_id: Option<u64>,
    state: EntryState,
    ack: Option<oneshot::Sender<Result<SubscriptionKey>>>,
}

enum PendingRequest {
    Subscribe {
        key: SubscriptionKey,
        kind: SubscriptionKind,
    },
    Unsubscribe {
        reply: Option<oneshot::Sender<Result<bool>>>,
    },
}

enum Reconnect {
    Connected(PubsubChannel),
    Exhausted,
    Shutdown,
}

struct Actor {
    connector: Arc<dyn PubsubConnector>,
    policy: ReconnectPolicy,
    terminated: Arc<AtomicBool>,
    entries: HashMap<SubscriptionKey, Entry>,
    routes: HashMap<u64, SubscriptionKey>,
    pending: HashMap<u64, PendingRequest>,
    next_request_id: u64,
    next_key: SubscriptionKey,
}

impl Actor {
    fn new(
        connector: Arc<dyn PubsubConnector>,
        policy: ReconnectPolicy,
        terminated: Arc<AtomicBool>,
    ) -> Self {
        Self {
            connector,
            policy,
            terminated,
            entries: HashMap::new(),
            routes: HashMap::new(),
            pending: HashMap::new(),
            next_request_id: 1,
            next_key: 1,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>, channel: PubsubChannel) {
        let mut channel = channel;
        loop {
            if self.serve(&mut commands, &mut channel).await {
                tracing::debug!("All subscription handles dropped, stopping multiplexer");
                return;
            }
            self.connection_lost();

            match self.reconnect(&mut commands).await {
                Reconnect::Connected(new_channel) => {
                    channel = new_channel;
                    self.resubscribe(&channel.outgoing);
                }
                Reconnect::Shutdown => return,
                Reconnect::Exhausted => {
                    self.terminate();
                    Self::refuse(commands, self.policy.max_attempts).await;
                    return;
                }
            }
        }
    }

    /// Serve one connection; returns true when every handle is gone
    async fn serve(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<Command>,
        channel: &mut PubsubChannel,
    ) -> bool {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command, Some(&channel.outgoing)),
                    None => return true,
                },
                frame = channel.incoming.recv() => match frame {
                    Some(text) => self.handle_frame(&text, &channel.outgoing),
                    None => {
                        tracing::warn!("PubSub connection lost");
                        return false;
                    }
                },
            }
        }
    }

    fn send_request(
        &mut self,
        outgoing: &mpsc::UnboundedSender<String>,
        method: &'static str,
        params: Value,
    ) -> Option<u64> {
        let id = self.next_request_id;
        self.next_request_id += 1;
        let frame = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        tracing::trace!("request: {}", frame);
        match outgoing.send(frame.to_string()) {
            Ok(()) => Some(id),
            Err(_) => {
                tracing::debug!("{} not sent, connection is closing", method);
                None
            }
        }
    }

    fn send_subscribe(&mut self, outgoing: &mpsc::UnboundedSender<String>, key: SubscriptionKey) {
        let Some(entry) = self.entries.get(&key) else {
            return;
        };
        let (kind, params) = (entry.kind, entry.params.clone());
        if let Some(id) = self.send_request(outgoing, kind.subscribe_method(), params) {
            self.pending
                .insert(id, PendingRequest::Subscribe { key, kind });
            if let Some(entry) = self.entries.get_mut(&key) {
                entry.state = EntryState::Pending;
            }
        }
    }

    fn send_unsubscribe(
        &mut self,
        outgoing: Option<&mpsc::UnboundedSender<String>>,
        kind: SubscriptionKind,
        server_id: u64,
        reply: Option<oneshot::Sender<Result<bool>>>,
    ) {
        let id = outgoing.and_then(|outgoing| {
            self.send_request(outgoing, kind.unsubscribe_method(), json!([server_id]))
        });
        match id {
            Some(id) => {
                self.pending.insert(id, PendingRequest::Unsubscribe { reply });
            }
            // The server forgets subscriptions with the connection
            None => {
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(true));
                }
            }
        }
    }

    fn handle_command(
        &mut self,
        command: Command,
        outgoing: Option<&mpsc::UnboundedSender<String>>,
    ) {
        match command {
            Command::Subscribe {
                kind,
                params,
                sink,
                reply,
            } => {
                let key = self.next_key;
                self.next_key += 1;
                self.entries.insert(
                    key,
                    Entry {
                        kind,
                        params,
                        sink,
                        server_id: None,
                        state: EntryState::Stale,
                        ack: Some(reply),
                    },
                );
                if let Some(outgoing) = outgoing {
                    self.send_subscribe(outgoing, key);
                }
            }
            Command::Unsubscribe { key, reply } => self.remove(key, outgoing, reply),
        }
    }

    /// Drop a subscription locally and close it on the server if it is live
    fn remove(
        &mut self,
        key: SubscriptionKey,
        outgoing: Option<&mpsc::UnboundedSender<String>>,
        reply: Option<oneshot::Sender<Result<bool>>>,
    ) {
        let Some(entry) = self.entries.remove(&key) else {
            if let Some(reply) = reply {
                let _ = reply.send(Ok(false));
            }
            return;
        };
        match (entry.state, entry.server_id) {
            (EntryState::Live, Some(server_id)) => {
                self.routes.remove(&server_id);
                tracing::debug!("Unsubscribing {} {}", entry.kind.subscribe_method(), server_id);
                self.send_unsubscribe(outgoing, entry.kind, server_id, reply);
            }
            // A pending subscribe is closed when its reply arrives
            _ => {
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(true));
                }
            }
        }
    }

    fn handle_frame(&mut self, text: &str, outgoing: &mpsc::UnboundedSender<String>) {
        tracing::trace!("received: {}", text);
        if let Ok(notification) = serde_json::from_str::<WsNotification>(text) {
            self.handle_notification(notification, outgoing);
            return;
        }
        if let Ok(response) = serde_json::from_str::<WsResponse>(text) {
            self.handle_response(response, outgoing);
            return;
        }
        tracing::warn!("Ignoring unrecognized frame: {}", text);
    }

    fn handle_notification(
        &mut self,
        notification: WsNotification,
        outgoing: &mpsc::UnboundedSender<String>,
    ) {
        let server_id = notification.params.subscription;
        let Some(&key) = self.routes.get(&server_id) else {
            tracing::warn!(
                "Dropping {} for unknown subscription {}",
                notification.method,
                server_id
            );
            return;
        };
        let Some(entry) = self.entries.get(&key) else {
            self.routes.remove(&server_id);
            return;
        };

        let delivered = entry.sink.send(notification.params.result).is_ok();
        if entry.kind.is_one_shot() {
            tracing::debug!("Signature subscription {} completed", server_id);
            self.routes.remove(&server_id);
            self.entries.remove(&key);
        } else if !delivered {
            tracing::debug!("Receiver for subscription {} dropped", server_id);
            self.remove(key, Some(outgoing), None);
        }
    }

    fn handle_response(&mut self, response: WsResponse, outgoing: &mpsc::UnboundedSender<String>) {
        let Some(request) = self.pending.remove(&response.id) else {
            tracing::warn!("Dropping reply to unknown request {}", response.id);
            return;
        };

        match request {
            PendingRequest::Subscribe { key, kind } => {
                let outcome = response.into_result::<u64>();
                let Some(entry) = self.entries.get_mut(&key) else {
                    // Unsubscribed while the request was in flight
                    if let Ok(server_id) = outcome {
                        self.send_unsubscribe(Some(outgoing), kind, server_id, None);
                    }
                    return;
                };
                match outcome {
                    Ok(server_id) => {
                        tracing::debug!("{} confirmed as {}", kind.subscribe_method(), server_id);
                        entry.server_id = Some(server_id);
                        entry.state = EntryState::Live;
                        self.routes.insert(server_id, key);
                        if let Some(ack) = entry.ack.take() {
                            if ack.send(Ok(key)).is_err() {
                                // The caller stopped waiting
                                self.remove(key, Some(outgoing), None);
                            }
                        }
                    }
                    Err(e) => {
                        if let Some(ack) = self.entries.remove(&key).and_then(|entry| entry.ack) {
                            let _ = ack.send(Err(e));
                        } else {
                            tracing::warn!("Resubscribing {} failed: {}", kind.subscribe_method(), e);
                        }
                    }
                }
            }
            PendingRequest::Unsubscribe { reply } => {
                let outcome = response.into_result::<bool>();
                match reply {
                    Some(reply) => {
                        let _ = reply.send(outcome);
                    }
                    None => {
                        if let Err(e) = outcome {
                            tracing::debug!("Unsubscribe failed: {}", e);
                        }
                    }
                }
            }
        }
    }

    fn connection_lost(&mut self) {
        for entry in self.entries.values_mut() {
            entry.state = EntryState::Stale;
            entry.server_id = None;
        }
        self.routes.clear();
        for (_, request) in self.pending.drain() {
            if let PendingRequest::Unsubscribe { reply: Some(reply) } = request {
                let _ = reply.send(Ok(true));
            }
        }
        tracing::info!("Marked {} subscriptions stale", self.entries.len());
    }

    async fn reconnect(&mut self, commands: &mut mpsc::UnboundedReceiver<Command>) -> Reconnect {
        for attempt in 1..=self.policy.max_attempts {
            let delay = self.policy.delay_for(attempt);
            tracing::info!(
                "Reconnecting in {:?} (attempt {}/{})",
                delay,
                attempt,
                self.policy.max_attempts
            );

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    command = commands.recv() => match command {
                        Some(command) => self.handle_command(command, None),
                        None => return Reconnect::Shutdown,
                    },
                }
            }

            match self.connector.connect().await {
                Ok(channel) => {
                    tracing::info!("PubSub connection re-established");
                    return Reconnect::Connected(channel);
                }
                Err(e) => tracing::warn!("Reconnection attempt {} failed: {}", attempt, e),
            }
        }
        tracing::error!(
            "Giving up after {} reconnection attempts",
            self.policy.max_attempts
        );
        Reconnect::Exhausted
    }

    fn resubscribe(&mut self, outgoing: &mpsc::UnboundedSender<String>) {
        let stale: Vec<SubscriptionKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.state == EntryState::Stale)
            .map(|(key, _)| *key)
            .collect();
        tracing::info!("Resubscribing {} subscriptions", stale.len());
        for key in stale {
            self.send_subscribe(outgoing, key);
        }
    }

    fn terminate(&mut self) {
        self.terminated.store(true, Ordering::SeqCst);
        let max = self.policy.max_attempts;
        for (_, entry) in self.entries.drain() {
            if let Some(ack) = entry.ack {
                let _ = ack.send(Err(TransportError::ReconnectionFailed { max }.into()));
            }
        }
        self.routes.clear();
    }

    /// Answer every later command with a failure until all handles are gone
    async fn refuse(mut commands: mpsc::UnboundedReceiver<Command>, max: u32) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Subscribe { reply, .. } => {
                    let _ = reply.send(Err(TransportError::ReconnectionFailed { max }.into()));
                }
                Command::Unsubscribe {
                    reply: Some(reply), ..
                } => {
                    let _ = reply.send(Err(TransportError::ReconnectionFailed { max }.into()));
                }
                Command::Unsubscribe { reply: None, .. } => {}
            }
        }
    }
}

/// Handle to the subscription actor
///
/// Cloning is cheap; every clone and every [`Subscription`] talks to the
/// same connection.
#[derive(Clone, Debug)]
pub struct SubscriptionMultiplexer {
    commands: mpsc::UnboundedSender<Command>,
    terminated: Arc<AtomicBool>,
    request_timeout: Duration,
}

impl SubscriptionMultiplexer {
    /// Connect and spawn the actor
    ///
    /// The first connection attempt is not retried; the policy only governs
    /// reconnection after an established connection is lost.
    pub async fn connect(
        connector: Arc<dyn PubsubConnector>,
        policy: ReconnectPolicy,
        request_timeout: Duration,
    ) -> Result<Self> {
        let channel = connector.connect().await?;
        let (commands, receiver) = mpsc::unbounded_channel();
        let terminated = Arc::new(AtomicBool::new(false));
        let actor = Actor::new(connector, policy, Arc::clone(&terminated));
        tokio::spawn(actor.run(receiver, channel));
        Ok(Self {
            commands,
            terminated,
            request_timeout,
        })
    }

    /// Whether reconnection was exhausted; every further call fails
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Open a stream of `kind` with raw `params`
    ///
    /// Waits up to the request timeout for the server to confirm.
    pub async fn subscribe<T: DeserializeOwned>(
        &self,
        kind: SubscriptionKind,
        params: Value,
    ) -> Result<Subscription<T>> {
        let (sink, notifications) = mpsc::unbounded_channel();
        let (reply, ack) = oneshot::channel();
        self.commands
            .send(Command::Subscribe {
                kind,
                params,
                sink,
                reply,
            })
            .map_err(|_| SubscriptionError::Closed)?;

        let key = match timeout(self.request_timeout, ack).await {
            Ok(Ok(result)) => result?,
            Ok(Err(_)) => return Err(SubscriptionError::Closed.into()),
            Err(_) => return Err(ClientError::timeout(self.request_timeout)),
        };
        Ok(Subscription::new(
            key,
            kind,
            self.commands.clone(),
            notifications,
        ))
    }

    /// Subscribe to the processing result of one transaction
    ///
    /// The server sends exactly one notification, once `commitment` is
    /// reached, and the stream ends after it.
    pub async fn signature_subscribe(
        &self,
        signature: &Signature,
        commitment: CommitmentLevel,
    ) -> Result<Subscription<SignatureNotification>> {
        let params = json!([signature.to_string(), CommitmentConfig::from(commitment)]);
        self.subscribe(SubscriptionKind::Signature, params).await
    }

    /// Subscribe to changes of one account
    pub async fn account_subscribe(
        &self,
        pubkey: &Pubkey,
        config: AccountInfoConfig,
    ) -> Result<Subscription<AccountNotification>> {
        let config = serde_json::to_value(config).map_err(SerializationError::JsonSerialize)?;
        self.subscribe(SubscriptionKind::Account, json!([pubkey.to_string(), config]))
            .await
    }

    /// Subscribe to transaction logs
    pub async fn logs_subscribe(
        &self,
        filter: LogsFilter,
        commitment: CommitmentLevel,
    ) -> Result<Subscription<LogsNotification>> {
        let filter = serde_json::to_value(filter).map_err(SerializationError::JsonSerialize)?;
        let params = json!([filter, CommitmentConfig::from(commitment)]);
        self.subscribe(SubscriptionKind::Logs, params).await
    }

    /// Subscribe to slot updates
    pub async fn slot_subscribe(&self) -> Result<Subscription<SlotInfo>> {
        self.subscribe(SubscriptionKind::Slot, json!([])).await
    }
}

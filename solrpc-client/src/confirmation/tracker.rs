//! Drives confirmation states from polls and push notifications

use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use solrpc_base::Signature;
use tokio::sync::{oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};

use crate::confirmation::state::{ConfirmationState, ConfirmationStatus, Observation, Outcome};
use crate::error::Result;
use crate::http::{RpcDispatcher, RpcRequest, RpcResponse};
use crate::types::{CommitmentLevel, SignatureNotification, SignatureResult};
use crate::websocket::{Subscription, SubscriptionMultiplexer};

/// Polling and timeout settings for confirmation tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationConfig {
    /// Interval between status polls
    pub poll_interval: Duration,
    /// Polls never happen more often than this, whatever `poll_interval` says
    pub min_poll_interval: Duration,
    /// Time budget after which tracking resolves as timed out
    pub timeout: Duration,
}

/// Lower bound on the poll interval, even when both settings are zero
const POLL_INTERVAL_FLOOR: Duration = Duration::from_millis(1);

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            min_poll_interval: Duration::from_millis(400),
            timeout: Duration::from_secs(90),
        }
    }
}

impl ConfirmationConfig {
    /// The interval actually used between polls
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval
            .max(self.min_poll_interval)
            .max(POLL_INTERVAL_FLOOR)
    }
}

/// Starts one background driver per tracked transaction
///
/// Every driver polls `getSignatureStatuses` (and `getBlockHeight` when the
/// blockhash expiry is known) on a fixed interval. When a multiplexer is
/// attached it also subscribes to the signature, so a push can resolve the
/// transaction before the next poll. Both paths feed the same
/// [`ConfirmationState`].
#[derive(Clone, Debug)]
pub struct ConfirmationTracker {
    dispatcher: RpcDispatcher,
    multiplexer: Option<SubscriptionMultiplexer>,
    config: ConfirmationConfig,
}

impl ConfirmationTracker {
    /// Create a polling-only tracker
    pub fn new(dispatcher: RpcDispatcher, config: ConfirmationConfig) -> Self {
        Self {
            dispatcher,
            multiplexer: None,
            config,
        }
    }

    /// Also use signature subscriptions
    pub fn with_subscriptions(mut self, multiplexer: SubscriptionMultiplexer) -> Self {
        self.multiplexer = Some(multiplexer);
        self
    }

    /// The tracker settings
    pub fn config(&self) -> &ConfirmationConfig {
        &self.config
    }

    /// Track `signature` until it reaches `target` or the configured timeout elapses
    pub fn track(
        &self,
        signature: Signature,
        target: CommitmentLevel,
        last_valid_block_height: Option<u64>,
    ) -> PendingConfirmation {
        self.track_with_timeout(signature, target, last_valid_block_height, self.config.timeout)
    }

    /// Track `signature` with an explicit time budget
    pub fn track_with_timeout(
        &self,
        signature: Signature,
        target: CommitmentLevel,
        last_valid_block_height: Option<u64>,
        timeout: Duration,
    ) -> PendingConfirmation {
        let state = ConfirmationState::new(signature, target, last_valid_block_height);
        let (status_tx, status_rx) = watch::channel(ConfirmationStatus::Submitted);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let driver = Driver {
            state,
            dispatcher: self.dispatcher.clone(),
            poll_interval: self.config.effective_poll_interval(),
            deadline: Instant::now() + timeout,
            status: status_tx,
        };
        tokio::spawn(driver.run(self.multiplexer.clone(), cancel_rx));

        PendingConfirmation {
            signature,
            status: status_rx,
            cancel: Some(cancel_tx),
        }
    }
}

/// Handle to one tracked transaction
///
/// Dropping the handle cancels tracking.
#[derive(Debug)]
pub struct PendingConfirmation {
    signature: Signature,
    status: watch::Receiver<ConfirmationStatus>,
    cancel: Option<oneshot::Sender<()>>,
}

impl PendingConfirmation {
    /// The tracked signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Snapshot of the current status
    pub fn status(&self) -> ConfirmationStatus {
        self.status.borrow().clone()
    }

    /// Wait for the outcome
    ///
    /// Returns `None` if tracking was cancelled before it resolved.
    pub async fn wait(mut self) -> Option<Outcome> {
        loop {
            let resolved = match &*self.status.borrow_and_update() {
                ConfirmationStatus::Resolved(outcome) => Some(outcome.clone()),
                _ => None,
            };
            if resolved.is_some() {
                return resolved;
            }
            if self.status.changed().await.is_err() {
                return match &*self.status.borrow() {
                    ConfirmationStatus::Resolved(outcome) => Some(outcome.clone()),
                    _ => None,
                };
            }
        }
    }

    /// Stop polling and unsubscribe; calling it again has no effect
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            tracing::debug!("Cancelling confirmation of {}", self.signature);
            let _ = cancel.send(());
        }
    }

    /// Whether [`cancel`](Self::cancel) was called
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }
}

struct Driver {
    state: ConfirmationState,
    dispatcher: RpcDispatcher,
    poll_interval: Duration,
    deadline: Instant,
    status: watch::Sender<ConfirmationStatus>,
}

type PollFuture = BoxFuture<'static, Result<Vec<Result<RpcResponse>>>>;

async fn next_poll(in_flight: &mut Option<PollFuture>) -> Result<Vec<Result<RpcResponse>>> {
    match in_flight {
        Some(poll) => poll.await,
        None => std::future::pending().await,
    }
}

async fn next_push(
    subscription: &mut Option<Subscription<SignatureNotification>>,
) -> Option<SignatureNotification> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

impl Driver {
    async fn run(
        mut self,
        multiplexer: Option<SubscriptionMultiplexer>,
        mut cancel: oneshot::Receiver<()>,
    ) {
        let signature = *self.state.signature();
        let target = self.state.target();

        // Subscribing may wait on a reconnecting multiplexer; polls run meanwhile
        let subscribe = async move {
            match multiplexer {
                Some(multiplexer) => multiplexer
                    .signature_subscribe(&signature, target)
                    .await
                    .map(Some),
                None => Ok(None),
            }
        };
        tokio::pin!(subscribe);
        let mut subscribing = true;
        let mut subscription: Option<Subscription<SignatureNotification>> = None;
        // A stalled poll must not hold off cancellation or the deadline
        let mut in_flight: Option<PollFuture> = None;

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = tokio::time::sleep_until(self.deadline);
        tokio::pin!(deadline);

        while !self.state.is_resolved() {
            tokio::select! {
                biased;
                _ = &mut cancel => {
                    tracing::debug!("Confirmation of {} cancelled", signature);
                    return;
                }
                _ = &mut deadline => {
                    tracing::info!("Confirmation of {} timed out", signature);
                    self.state.time_out();
                }
                result = &mut subscribe, if subscribing => {
                    subscribing = false;
                    match result {
                        Ok(subscribed) => subscription = subscribed,
                        Err(e) => {
                            tracing::warn!(
                                "Subscribing to {} failed, polling only: {}",
                                signature,
                                e
                            );
                        }
                    }
                }
                notification = next_push(&mut subscription) => match notification {
                    Some(notification) => self.on_push(notification),
                    None => {
                        tracing::debug!("Signature subscription for {} ended", signature);
                        subscription = None;
                    }
                },
                results = next_poll(&mut in_flight) => {
                    in_flight = None;
                    self.apply_poll(results);
                }
                _ = ticker.tick(), if in_flight.is_none() => in_flight = Some(self.start_poll()),
            }

            let current = self.state.status();
            self.status.send_if_modified(|published| {
                if published != current {
                    *published = current.clone();
                    true
                } else {
                    false
                }
            });
        }
        tracing::debug!("Confirmation of {} resolved: {:?}", signature, self.state.status());
    }

    fn on_push(&mut self, notification: SignatureNotification) {
        match notification.value {
            SignatureResult::Processed { err } => {
                let signature = *self.state.signature();
                // The server only notifies once the subscribed commitment is reached
                let commitment = self.state.target();
                let status = self.state.observe(Observation::Status {
                    slot: notification.context.slot,
                    commitment,
                    err,
                });
                tracing::debug!("Push for {}: {:?}", signature, status);
            }
            SignatureResult::Received(_) => {}
        }
    }

    /// Poll status and block height in one batch
    fn start_poll(&self) -> PollFuture {
        let signature = *self.state.signature();
        let mut requests = vec![RpcRequest::GetSignatureStatuses {
            signatures: vec![signature],
            search_transaction_history: false,
        }];
        if self.state.last_valid_block_height().is_some() {
            requests.push(RpcRequest::GetBlockHeight {
                commitment: Some(self.state.target()),
            });
        }

        let dispatcher = self.dispatcher.clone();
        async move { dispatcher.batch(requests).await }.boxed()
    }

    /// Feed a poll's results into the state; failures are logged and retried next tick
    fn apply_poll(&mut self, results: Result<Vec<Result<RpcResponse>>>) {
        let signature = *self.state.signature();
        let results = match results {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Status poll for {} failed: {}", signature, e);
                return;
            }
        };

        // Statuses come first so a landed transaction wins over expiry
        for result in results {
            let observation = match result {
                Ok(RpcResponse::SignatureStatuses(response)) => {
                    match response.value.into_iter().next().flatten() {
                        Some(status) => Observation::from(&status),
                        None => Observation::NotFound,
                    }
                }
                Ok(RpcResponse::BlockHeight(height)) => Observation::BlockHeight(height),
                Ok(other) => {
                    tracing::warn!("Unexpected {} in status poll", other.kind());
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Status poll for {} failed: {}", signature, e);
                    continue;
                }
            };
            self.state.observe(observation);
        }
    }
}

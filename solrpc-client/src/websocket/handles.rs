//! Typed handles for multiplexed subscriptions
//!
//! Each handle owns the single receiver for its stream. Dropping a handle
//! unsubscribes in the background.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Result, SubscriptionError};
use crate::websocket::multiplexer::{Command, SubscriptionKind};

/// Client-chosen key of a subscription, stable across reconnections
pub type SubscriptionKey = u64;

/// Base trait for all subscription handles
pub trait SubscriptionHandle {
    /// Get the subscription key
    fn subscription_key(&self) -> SubscriptionKey;

    /// Check if the subscription is still active
    fn is_active(&self) -> bool;

    /// Manually unsubscribe (automatically done on drop)
    ///
    /// Returns `Ok(false)` when the subscription was already closed.
    fn unsubscribe(&mut self) -> impl std::future::Future<Output = Result<bool>> + Send;
}

/// A stream of notifications of type `T`
pub struct Subscription<T> {
    key: SubscriptionKey,
    kind: SubscriptionKind,
    commands: mpsc::UnboundedSender<Command>,
    notifications: mpsc::UnboundedReceiver<Value>,
    active: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("active", &self.active)
            .finish()
    }
}

impl<T> Subscription<T> {
    pub(crate) fn new(
        key: SubscriptionKey,
        kind: SubscriptionKind,
        commands: mpsc::UnboundedSender<Command>,
        notifications: mpsc::UnboundedReceiver<Value>,
    ) -> Self {
        Self {
            key,
            kind,
            commands,
            notifications,
            active: true,
            _marker: PhantomData,
        }
    }

    /// The kind of stream
    pub fn kind(&self) -> SubscriptionKind {
        self.kind
    }
}

impl<T: DeserializeOwned> Subscription<T> {
    /// Get the next notification from this subscription
    ///
    /// Returns `None` once the stream has ended: after unsubscribing, after
    /// the single notification of a signature subscription, or when the
    /// connection could not be re-established.
    pub async fn next(&mut self) -> Option<T> {
        if !self.active {
            return None;
        }
        loop {
            let value = self.notifications.recv().await?;
            match serde_json::from_value(value) {
                Ok(notification) => return Some(notification),
                Err(e) => tracing::warn!(
                    "Dropping malformed {} notification: {}",
                    self.kind.subscribe_method(),
                    e
                ),
            }
        }
    }
}

impl<T> SubscriptionHandle for Subscription<T> {
    fn subscription_key(&self) -> SubscriptionKey {
        self.key
    }

    fn is_active(&self) -> bool {
        self.active
    }

    async fn unsubscribe(&mut self) -> Result<bool> {
        if !self.active {
            return Ok(false);
        }
        self.active = false;

        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Unsubscribe {
                key: self.key,
                reply: Some(reply),
            })
            .map_err(|_| SubscriptionError::Closed)?;
        response.await.map_err(|_| SubscriptionError::Closed)?
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if self.active {
            self.active = false;
            let _ = self.commands.send(Command::Unsubscribe {
                key: self.key,
                reply: None,
            });
        }
    }
}

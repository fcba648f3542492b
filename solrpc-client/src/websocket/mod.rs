//! WebSocket PubSub: connection, multiplexing and reconnection

pub mod connection;
pub mod handles;
pub mod multiplexer;
pub mod reconnect;

pub use connection::{PubsubChannel, PubsubConnector, WsConnector};
pub use handles::{Subscription, SubscriptionHandle, SubscriptionKey};
pub use multiplexer::{SubscriptionKind, SubscriptionMultiplexer};
pub use reconnect::ReconnectPolicy;

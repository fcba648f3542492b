//! Duplex text-frame connections for the PubSub API

use std::fmt::Debug;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};
use url::Url;

use crate::error::TransportError;

/// One established connection, seen as two channels of text frames
///
/// The connection is gone once `incoming` yields `None`. Dropping `outgoing`
/// closes it from the client side.
#[derive(Debug)]
pub struct PubsubChannel {
    /// Frames to send to the server
    pub outgoing: mpsc::UnboundedSender<String>,
    /// Frames received from the server
    pub incoming: mpsc::UnboundedReceiver<String>,
}

impl PubsubChannel {
    /// Create a connected pair: the channel and the peer's ends
    ///
    /// The peer receives what the channel sends and vice versa. Useful for
    /// connectors that are not sockets.
    pub fn pair() -> (
        Self,
        (mpsc::UnboundedReceiver<String>, mpsc::UnboundedSender<String>),
    ) {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        (
            Self {
                outgoing: outgoing_tx,
                incoming: incoming_rx,
            },
            (outgoing_rx, incoming_tx),
        )
    }
}

/// Establishes [`PubsubChannel`]s; called again on every reconnection
#[async_trait]
pub trait PubsubConnector: Send + Sync + Debug {
    /// Open a new connection
    async fn connect(&self) -> Result<PubsubChannel, TransportError>;
}

/// WebSocket connector backed by tokio-tungstenite
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: Url,
    auth_token: Option<String>,
}

impl WsConnector {
    /// Create a connector for `url`, sending `auth_token` as a bearer token
    pub fn new(url: Url, auth_token: Option<String>) -> Self {
        Self { url, auth_token }
    }

    /// Pump frames between the socket and the channel ends until either side closes
    async fn pump(
        ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
        mut outgoing: mpsc::UnboundedReceiver<String>,
        incoming: mpsc::UnboundedSender<String>,
    ) {
        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        tracing::info!("WebSocket connection established");

        loop {
            tokio::select! {
                frame = outgoing.recv() => {
                    match frame {
                        Some(text) => {
                            if let Err(e) = ws_sink.send(Message::Text(text)).await {
                                tracing::error!("WebSocket send failed: {}", e);
                                break;
                            }
                        }
                        None => {
                            tracing::debug!("Outgoing channel closed, closing WebSocket");
                            let _ = ws_sink.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }

                message = ws_stream.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            if incoming.send(text).is_err() {
                                tracing::debug!("Incoming channel closed, closing WebSocket");
                                let _ = ws_sink.send(Message::Close(None)).await;
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = ws_sink.send(Message::Pong(payload)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("WebSocket connection closed by server");
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::error!("WebSocket receive failed: {}", e);
                            break;
                        }
                        None => {
                            tracing::info!("WebSocket stream ended");
                            break;
                        }
                        _ => {} // Ignore other message types
                    }
                }
            }
        }
    }
}

#[async_trait]
impl PubsubConnector for WsConnector {
    async fn connect(&self) -> Result<PubsubChannel, TransportError> {
        tracing::info!("Connecting to WebSocket endpoint: {}", self.url);
        let mut request = self.url.as_str().into_client_request()?;
        if let Some(ref token) = self.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                TransportError::ConnectionClosed("invalid auth token header".to_string())
            })?;
            request.headers_mut().insert("Authorization", value);
        }

        let config = WebSocketConfig {
            max_frame_size: Some(32 << 20),
            ..Default::default()
        };
        tracing::debug!("WebSocket config: {:?}", config);
        let (ws_stream, _) = connect_async_with_config(request, Some(config), false).await?;

        let (channel, (outgoing_rx, incoming_tx)) = PubsubChannel::pair();
        tokio::spawn(Self::pump(ws_stream, outgoing_rx, incoming_tx));
        Ok(channel)
    }
}

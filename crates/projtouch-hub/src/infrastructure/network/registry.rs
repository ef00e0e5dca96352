//! Subscriber registry and broadcast fan-out.
//!
//! Subscribers are delivery endpoints behind the [`MessageSink`] trait; the
//! production sink wraps the write half of a WebSocket connection. Broadcast
//! walks the full subscriber list under one lock, delivering to each in turn,
//! and removes the sinks that failed once the pass completes. Delivery
//! failure is how disconnects are detected; it never becomes a caller-visible
//! error.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use projtouch_core::OutboundMessage;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use uuid::Uuid;

/// Identifier assigned to each connected subscriber.
pub type SubscriberId = Uuid;

/// Error produced by a failed delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("failed to serialize outbound message: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("websocket send failed: {0}")]
    Send(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("subscriber closed: {0}")]
    Closed(String),
}

/// Delivery endpoint for outbound messages.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Delivers one message. An error marks this subscriber for removal.
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DeliveryError>;
}

/// [`MessageSink`] backed by the write half of a WebSocket connection.
pub struct WsMessageSink {
    writer: Mutex<SplitSink<WebSocketStream<TcpStream>, Message>>,
}

impl WsMessageSink {
    pub fn new(writer: SplitSink<WebSocketStream<TcpStream>, Message>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

#[async_trait]
impl MessageSink for WsMessageSink {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        let payload = serde_json::to_string(message)?;
        let mut writer = self.writer.lock().await;
        writer.send(Message::Text(payload)).await?;
        Ok(())
    }
}

/// Registry of connected subscribers.
///
/// One async mutex guards the list. Connect, disconnect, and broadcast all
/// serialize through it, so a broadcast pass never interleaves with a
/// membership change.
pub struct SubscriberRegistry {
    subscribers: Mutex<Vec<(SubscriberId, Arc<dyn MessageSink>)>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Adds a subscriber and returns its assigned id.
    pub async fn connect(&self, sink: Arc<dyn MessageSink>) -> SubscriberId {
        let id = Uuid::new_v4();
        let mut subscribers = self.subscribers.lock().await;
        subscribers.push((id, sink));
        tracing::info!(subscriber_id = %id, total = subscribers.len(), "subscriber connected");
        id
    }

    /// Removes a subscriber. Unknown ids are a no-op.
    pub async fn disconnect(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.lock().await;
        let before = subscribers.len();
        subscribers.retain(|(subscriber_id, _)| *subscriber_id != id);
        if subscribers.len() < before {
            tracing::info!(subscriber_id = %id, total = subscribers.len(), "subscriber disconnected");
        }
    }

    /// Number of currently connected subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Delivers `message` to every subscriber, in connection order.
    ///
    /// A failed delivery does not stop the pass; subscribers that failed are
    /// removed from the registry after every remaining subscriber has had its
    /// attempt.
    pub async fn broadcast(&self, message: &OutboundMessage) {
        let mut subscribers = self.subscribers.lock().await;
        let mut failed: Vec<SubscriberId> = Vec::new();
        for (id, sink) in subscribers.iter() {
            if let Err(err) = sink.deliver(message).await {
                tracing::debug!(subscriber_id = %id, error = %err, "delivery failed; dropping subscriber");
                failed.push(*id);
            }
        }
        if !failed.is_empty() {
            subscribers.retain(|(id, _)| !failed.contains(id));
            tracing::info!(
                dropped = failed.len(),
                total = subscribers.len(),
                "removed unreachable subscribers"
            );
        }
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

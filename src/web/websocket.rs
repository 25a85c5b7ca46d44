//! WebSocket subscribers
//!
//! Each connection gets a task that forwards hub payloads to the socket
//! and reads whatever the client sends as a liveness signal. The hub only
//! ever sees a `WsSubscriber`, which feeds that task through a small
//! bounded channel. A subscriber that stays full for too many frames in
//! a row is treated as gone.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::constants::MAX_CONSECUTIVE_SKIPS;
use crate::error::SubscriberError;
use crate::hub::{Subscriber, SubscriberId};
use crate::protocol::EncodedPayload;
use crate::web::server::AppState;

/// Longest a single socket write may take before the peer is dropped
const SOCKET_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Hub-facing handle for one WebSocket connection
pub struct WsSubscriber {
    id: SubscriberId,
    outbound: mpsc::Sender<EncodedPayload>,
    closed: AtomicBool,
    /// Publishes skipped in a row because the slot was full
    skipped: AtomicU32,
}

impl WsSubscriber {
    pub fn new(outbound: mpsc::Sender<EncodedPayload>) -> Self {
        Self {
            id: SubscriberId::new(),
            outbound,
            closed: AtomicBool::new(false),
            skipped: AtomicU32::new(0),
        }
    }

    /// Mark the connection closed; later sends fail
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Subscriber for WsSubscriber {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn is_active(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && !self.outbound.is_closed()
    }

    async fn send(&self, payload: EncodedPayload) -> Result<(), SubscriberError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SubscriberError::Closed);
        }
        match self.outbound.try_send(payload) {
            Ok(()) => {
                self.skipped.store(0, Ordering::SeqCst);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                let skipped = self.skipped.fetch_add(1, Ordering::SeqCst) + 1;
                if skipped > MAX_CONSECUTIVE_SKIPS {
                    tracing::debug!("Client {} stalled for {} frames", self.id, skipped);
                    self.close();
                    return Err(SubscriberError::Closed);
                }
                Err(SubscriberError::Backpressure)
            }
            Err(TrySendError::Closed(_)) => {
                self.close();
                Err(SubscriberError::Closed)
            }
        }
    }
}

/// WebSocket upgrade handler for the measurement stream
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (outbound_tx, mut outbound_rx) = mpsc::channel(state.outbound_capacity);
    let subscriber = Arc::new(WsSubscriber::new(outbound_tx));
    let id = subscriber.id();

    state.hub.register(subscriber.clone());
    tracing::info!("Added client {}, there are {} connected", id, state.hub.count());

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            payload = outbound_rx.recv() => {
                let Some(payload) = payload else { break };
                let message = Message::Text(payload.as_str().to_string());
                match tokio::time::timeout(SOCKET_SEND_TIMEOUT, sender.send(message)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) => {
                        tracing::debug!("Client {} dropped during send", id);
                        break;
                    }
                    Err(_) => {
                        tracing::debug!("Client {} send timed out", id);
                        break;
                    }
                }
            }

            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!("Client {} receive error: {}", id, e);
                        break;
                    }
                    // Content is irrelevant, any message proves liveness
                    Some(Ok(_)) => tracing::trace!("Ping from client {}", id),
                }
            }
        }
    }

    subscriber.close();
    state.hub.unregister(id);
    tracing::info!(
        "Client {} disconnected, there are {} clients left",
        id,
        state.hub.count()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_fills_then_backpressures() {
        let (tx, mut rx) = mpsc::channel(1);
        let subscriber = WsSubscriber::new(tx);

        assert_eq!(subscriber.send(EncodedPayload::from("a")).await, Ok(()));
        assert_eq!(
            subscriber.send(EncodedPayload::from("b")).await,
            Err(SubscriberError::Backpressure)
        );
        assert_eq!(rx.recv().await.unwrap().as_str(), "a");
        assert!(subscriber.is_active());
    }

    #[tokio::test]
    async fn test_stalled_subscriber_eventually_closed() {
        let (tx, _rx) = mpsc::channel(1);
        let subscriber = WsSubscriber::new(tx);
        assert_eq!(subscriber.send(EncodedPayload::from("a")).await, Ok(()));

        for _ in 0..MAX_CONSECUTIVE_SKIPS {
            assert_eq!(
                subscriber.send(EncodedPayload::from("b")).await,
                Err(SubscriberError::Backpressure)
            );
        }
        assert_eq!(
            subscriber.send(EncodedPayload::from("c")).await,
            Err(SubscriberError::Closed)
        );
        assert!(!subscriber.is_active());
    }

    #[tokio::test]
    async fn test_delivery_resets_skip_count() {
        let (tx, mut rx) = mpsc::channel(1);
        let subscriber = WsSubscriber::new(tx);
        subscriber.send(EncodedPayload::from("a")).await.unwrap();

        for _ in 0..MAX_CONSECUTIVE_SKIPS {
            assert_eq!(
                subscriber.send(EncodedPayload::from("b")).await,
                Err(SubscriberError::Backpressure)
            );
        }
        rx.recv().await.unwrap();
        assert_eq!(subscriber.send(EncodedPayload::from("c")).await, Ok(()));

        for _ in 0..MAX_CONSECUTIVE_SKIPS {
            assert_eq!(
                subscriber.send(EncodedPayload::from("d")).await,
                Err(SubscriberError::Backpressure)
            );
        }
        assert!(subscriber.is_active());
    }

    #[tokio::test]
    async fn test_hub_reaps_stalled_subscriber() {
        let hub = crate::hub::Hub::new();
        let (tx, _rx) = mpsc::channel(1);
        hub.register(Arc::new(WsSubscriber::new(tx)));

        let payload = EncodedPayload::from("x");
        hub.publish(&payload).await;
        for _ in 0..MAX_CONSECUTIVE_SKIPS {
            assert_eq!(hub.publish(&payload).await.skipped, 1);
        }
        assert_eq!(hub.publish(&payload).await.reaped, 1);
        assert_eq!(hub.count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_closed() {
        let (tx, rx) = mpsc::channel(1);
        let subscriber = WsSubscriber::new(tx);
        drop(rx);

        assert!(!subscriber.is_active());
        assert_eq!(
            subscriber.send(EncodedPayload::from("a")).await,
            Err(SubscriberError::Closed)
        );
    }

    #[tokio::test]
    async fn test_close_rejects_sends() {
        let (tx, _rx) = mpsc::channel(1);
        let subscriber = WsSubscriber::new(tx);
        subscriber.close();

        assert!(!subscriber.is_active());
        assert_eq!(
            subscriber.send(EncodedPayload::from("a")).await,
            Err(SubscriberError::Closed)
        );
    }
}

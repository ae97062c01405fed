//! Live Channel
//!
//! Persistent WebSocket connection carrying [`ClientEvent`]s out and
//! [`ServerEvent`]s in. One writer task drains an outbound queue; one reader
//! task fans inbound events out to every room [`Subscription`].

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::error::{ChatError, ChatResult};
use super::events::{ClientEvent, ServerEvent};
use crate::models::Message;

const INBOUND_CAPACITY: usize = 256;

pub struct LiveChannel {
    outbound: mpsc::UnboundedSender<ClientEvent>,
    inbound: broadcast::Sender<ServerEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl LiveChannel {
    /// Connect to the chat socket at `url` (`ws://` or `wss://`)
    pub async fn connect(url: &str) -> ChatResult<Self> {
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        let (mut sink, mut source) = stream.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);

        let writer = tokio::spawn(async move {
            while let Some(event) = outbound_rx.recv().await {
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize live event");
                        continue;
                    }
                };
                if sink.send(WsMessage::Text(text)).await.is_err() {
                    tracing::debug!("Live channel send failed, closing writer");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let inbound_tx = inbound.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            // No subscribers is fine; the event is dropped
                            let _ = inbound_tx.send(event);
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, text = %text, "Unrecognized live event");
                        }
                    },
                    Ok(WsMessage::Close(_)) => {
                        tracing::debug!("Live channel closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Live channel receive error");
                        break;
                    }
                }
            }
        });

        tracing::info!(url = %url, "Live channel connected");

        Ok(Self {
            outbound,
            inbound,
            tasks: vec![writer, reader],
        })
    }

    /// Queue an event for sending
    pub fn emit(&self, event: ClientEvent) -> ChatResult<()> {
        self.outbound.send(event).map_err(|_| ChatError::Closed)
    }

    /// Join a room and listen for its messages
    ///
    /// The listener is attached before the join is sent, so nothing posted
    /// after the join is missed.
    pub fn join(&self, room: &str) -> ChatResult<Subscription> {
        let receiver = self.inbound.subscribe();
        self.emit(ClientEvent::JoinRoom {
            room: room.to_string(),
        })?;
        tracing::debug!(room = %room, "Joined room");

        Ok(Subscription {
            room: room.to_string(),
            receiver,
            outbound: self.outbound.clone(),
        })
    }

    pub fn ping(&self) -> ChatResult<()> {
        self.emit(ClientEvent::Ping)
    }

    /// Channel wired to in-process queues instead of a socket
    #[cfg(test)]
    pub(crate) fn loopback() -> (
        Self,
        mpsc::UnboundedReceiver<ClientEvent>,
        broadcast::Sender<ServerEvent>,
    ) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);
        let channel = Self {
            outbound,
            inbound: inbound.clone(),
            tasks: Vec::new(),
        };
        (channel, outbound_rx, inbound)
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Membership of one room; leaves the room when dropped
pub struct Subscription {
    room: String,
    receiver: broadcast::Receiver<ServerEvent>,
    outbound: mpsc::UnboundedSender<ClientEvent>,
}

impl Subscription {
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Next message posted to this room; `None` once the channel is gone
    pub async fn next_message(&mut self) -> Option<Message> {
        loop {
            match self.receiver.recv().await {
                Ok(ServerEvent::Error { message }) => {
                    tracing::warn!(room = %self.room, error = %message, "Live channel reported an error");
                }
                Ok(event) if event.room() == Some(self.room.as_str()) => {
                    if let ServerEvent::ReceiveMessage { message } = event {
                        return Some(message);
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(room = %self.room, skipped, "Live subscriber fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.outbound.send(ClientEvent::LeaveRoom {
            room: self.room.clone(),
        });
        tracing::debug!(room = %self.room, "Left room");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::panel::message;
    use axum::extract::ws::{Message as AxumMessage, WebSocket, WebSocketUpgrade};
    use axum::{routing::get, Router};
    use std::time::Duration;

    /// Minimal chat relay: answers joins and echoes sends, preceded by a
    /// message for an unrelated room
    async fn relay(mut socket: WebSocket, seen: mpsc::UnboundedSender<ClientEvent>) {
        while let Some(Ok(frame)) = socket.recv().await {
            let AxumMessage::Text(text) = frame else {
                continue;
            };
            let event: ClientEvent = serde_json::from_str(&text).unwrap();
            let _ = seen.send(event.clone());

            let replies = match event {
                ClientEvent::JoinRoom { room } => vec![ServerEvent::Joined { room }],
                ClientEvent::LeaveRoom { room } => vec![ServerEvent::Left { room }],
                ClientEvent::SendMessage { message: msg } => vec![
                    ServerEvent::ReceiveMessage {
                        message: message(Some("x1"), "other-room", "v9", "not yours", None),
                    },
                    ServerEvent::ReceiveMessage { message: msg },
                ],
                ClientEvent::Ping => vec![ServerEvent::Pong],
            };
            for reply in replies {
                let text = serde_json::to_string(&reply).unwrap();
                if socket.send(AxumMessage::Text(text)).await.is_err() {
                    return;
                }
            }
        }
    }

    async fn spawn_relay() -> (String, mpsc::UnboundedReceiver<ClientEvent>) {
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();
        let router = Router::new().route(
            "/ws",
            get(move |ws: WebSocketUpgrade| {
                let seen = seen_tx.clone();
                async move { ws.on_upgrade(move |socket| relay(socket, seen)) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("ws://{}/ws", addr), seen_rx)
    }

    async fn next_seen(seen: &mut mpsc::UnboundedReceiver<ClientEvent>) -> ClientEvent {
        tokio::time::timeout(Duration::from_secs(2), seen.recv())
            .await
            .expect("relay saw nothing")
            .expect("relay channel closed")
    }

    #[tokio::test]
    async fn test_subscription_receives_only_its_room() {
        let (url, mut seen) = spawn_relay().await;
        let channel = LiveChannel::connect(&url).await.unwrap();

        let mut sub = channel.join("c1").unwrap();
        assert_eq!(
            next_seen(&mut seen).await,
            ClientEvent::JoinRoom {
                room: "c1".to_string()
            }
        );

        let outgoing = message(None, "c1", "u1", "hello", Some("k1"));
        channel
            .emit(ClientEvent::SendMessage {
                message: outgoing.clone(),
            })
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), sub.next_message())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.client_key.as_deref(), Some("k1"));
        assert_eq!(received.conversation_id, "c1");
    }

    #[tokio::test]
    async fn test_dropping_subscription_leaves_room() {
        let (url, mut seen) = spawn_relay().await;
        let channel = LiveChannel::connect(&url).await.unwrap();

        let sub = channel.join("c7").unwrap();
        next_seen(&mut seen).await;
        drop(sub);

        assert_eq!(
            next_seen(&mut seen).await,
            ClientEvent::LeaveRoom {
                room: "c7".to_string()
            }
        );

        channel.ping().unwrap();
        assert_eq!(next_seen(&mut seen).await, ClientEvent::Ping);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let result = LiveChannel::connect("ws://127.0.0.1:1/ws").await;
        assert!(matches!(result, Err(ChatError::Transport(_))));
    }
}

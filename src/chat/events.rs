//! Live Channel Events
//!
//! JSON frames exchanged on the chat socket. Rooms are named by
//! conversation id.

use serde::{Deserialize, Serialize};

use crate::models::Message;

/// Frames sent from the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Start receiving messages for a conversation
    JoinRoom { room: String },
    /// Stop receiving messages for a conversation
    LeaveRoom { room: String },
    /// Relay a message to the other participants
    SendMessage { message: Message },
    Ping,
}

/// Frames sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Joined { room: String },
    Left { room: String },
    /// A message was posted to a room
    ReceiveMessage { message: Message },
    Pong,
    Error { message: String },
}

impl ServerEvent {
    /// The room an inbound event concerns, if any
    pub fn room(&self) -> Option<&str> {
        match self {
            ServerEvent::Joined { room } | ServerEvent::Left { room } => Some(room),
            ServerEvent::ReceiveMessage { message } => Some(&message.conversation_id),
            ServerEvent::Pong | ServerEvent::Error { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_join_room_wire_shape() {
        let json = serde_json::to_string(&ClientEvent::JoinRoom {
            room: "c1".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"join_room","room":"c1"}"#);
    }

    #[test]
    fn test_receive_message_deserialize() {
        let json = r#"{
            "type": "receive_message",
            "message": {
                "conversation_id": "c1",
                "sender_id": "v1",
                "text": "Hello",
                "sent_at": "2026-05-01T10:00:00Z",
                "client_key": "k1"
            }
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.room(), Some("c1"));
        match event {
            ServerEvent::ReceiveMessage { message } => {
                assert_eq!(message.text, "Hello");
                assert_eq!(message.client_key.as_deref(), Some("k1"));
                assert!(message.id.is_none());
            }
            other => panic!("Expected ReceiveMessage, got {:?}", other),
        }
    }

    #[test]
    fn test_send_message_carries_client_key() {
        let event = ClientEvent::SendMessage {
            message: Message {
                id: None,
                conversation_id: "c1".to_string(),
                sender_id: "u1".to_string(),
                text: "Hi".to_string(),
                sent_at: Utc::now(),
                client_key: Some("k9".to_string()),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"send_message""#));
        assert!(json.contains(r#""client_key":"k9""#));
        assert!(!json.contains(r#""id""#));
    }

    #[test]
    fn test_ping_pong() {
        let ping: ClientEvent = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(ping, ClientEvent::Ping);
        assert_eq!(
            serde_json::to_string(&ServerEvent::Pong).unwrap(),
            r#"{"type":"pong"}"#
        );
    }
}

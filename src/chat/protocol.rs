//! Wire events for the chat socket.
//!
//! Frames are JSON text, tagged by `"type"`. A client connects, declares
//! who it is with `join_chat`, then exchanges `send_message` /
//! `receive_message` frames. Join state is not persisted across
//! connections: a reconnecting client re-joins and re-fetches history
//! over HTTP.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::store::Message;

/// Frames the client sends. Malformed frames are dropped with a log
/// line; there is no error channel back to the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Bind this connection to the room named by the user id.
    JoinChat {
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// Relay a message; ids arrive as uuid strings and are parsed at
    /// the boundary.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        sender_id: String,
        receiver_id: String,
        text: String,
        #[serde(default)]
        client_message_id: Option<String>,
    },
}

/// Frames the server pushes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    ReceiveMessage {
        sender_id: Uuid,
        receiver_id: Uuid,
        text: String,
        timestamp: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_message_id: Option<String>,
    },
    /// Full active-user list, broadcast to every connection whenever a
    /// user comes online or fully disconnects.
    ActiveUsers { users: Vec<Uuid> },
}

impl ServerEvent {
    pub fn receive_message(message: &Message) -> Self {
        Self::ReceiveMessage {
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            text: message.text.clone(),
            timestamp: message.timestamp,
            client_message_id: message.client_message_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_chat_parses() {
        let frame = r#"{"type":"join_chat","userId":"018f4e2a-0000-7000-8000-000000000001"}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        match event {
            ClientEvent::JoinChat { user_id } => {
                assert_eq!(user_id, "018f4e2a-0000-7000-8000-000000000001");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn send_message_parses_with_optional_client_id() {
        let frame = json!({
            "type": "send_message",
            "senderId": "u1",
            "receiverId": "u2",
            "text": "hi",
        });
        let event: ClientEvent = serde_json::from_value(frame).unwrap();
        match event {
            ClientEvent::SendMessage { sender_id, receiver_id, text, client_message_id } => {
                assert_eq!((sender_id.as_str(), receiver_id.as_str()), ("u1", "u2"));
                assert_eq!(text, "hi");
                assert!(client_message_id.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn receive_message_uses_camel_case_keys() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let event = ServerEvent::ReceiveMessage {
            sender_id: a,
            receiver_id: b,
            text: "hi".into(),
            timestamp: 1_700_000_000_000,
            client_message_id: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "receive_message");
        assert_eq!(value["senderId"], a.to_string());
        assert_eq!(value["receiverId"], b.to_string());
        assert_eq!(value["timestamp"], 1_700_000_000_000i64);
        assert!(value.get("clientMessageId").is_none());
    }

    #[test]
    fn active_users_serializes_user_array() {
        let user = Uuid::now_v7();
        let value = serde_json::to_value(ServerEvent::ActiveUsers { users: vec![user] }).unwrap();
        assert_eq!(value["type"], "active_users");
        assert_eq!(value["users"][0], user.to_string());
    }

    #[test]
    fn garbage_frame_is_an_error() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"dance"}"#).is_err());
    }
}

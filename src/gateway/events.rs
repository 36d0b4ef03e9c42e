use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{messages::SendMessage, store::MessageDetails};

/// Frames a client may send: `{"event": "...", "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    SendMessage(SendMessage),
    MarkAsRead(MarkAsRead),
    Typing(TypingNotice),
    StopTyping(TypingNotice),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsRead {
    pub sender_id: Uuid,
    #[serde(default)]
    pub mission_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingNotice {
    pub receiver_id: Uuid,
    #[serde(default)]
    pub mission_id: Option<Uuid>,
}

/// Optional correlation id riding next to `event`/`data` in a client frame.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AckRequest {
    #[serde(default)]
    pub ack: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Connected {
        user_id: Uuid,
    },
    UnreadCount {
        count: i64,
    },
    NewMessage(MessageDetails),
    MessageSent(MessageDetails),
    MessagesRead {
        read_by: Uuid,
        mission_id: Option<Uuid>,
    },
    UserTyping {
        user_id: Uuid,
        mission_id: Option<Uuid>,
    },
    UserStopTyping {
        user_id: Uuid,
        mission_id: Option<Uuid>,
    },
    Error {
        message: String,
    },
    /// Answer to a client frame that carried an `ack` id.
    Ack {
        id: u64,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<MessageDetails>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_send_message_frame() {
        let receiver = Uuid::now_v7();
        let frame = json!({
            "event": "send_message",
            "data": { "receiverId": receiver, "content": "hi", "missionId": null },
            "ack": 7,
        })
        .to_string();

        let event: ClientEvent = serde_json::from_str(&frame).unwrap();
        let ClientEvent::SendMessage(input) = event else {
            panic!("wrong variant: {event:?}");
        };
        assert_eq!(input.receiver_id, receiver);
        assert_eq!(input.content, "hi");
        assert!(input.mission_id.is_none());

        let ack: AckRequest = serde_json::from_str(&frame).unwrap();
        assert_eq!(ack.ack, Some(7));
    }

    #[test]
    fn mission_id_is_optional() {
        let frame = json!({ "event": "typing", "data": { "receiverId": Uuid::now_v7() } });
        assert!(matches!(
            serde_json::from_value::<ClientEvent>(frame).unwrap(),
            ClientEvent::Typing(TypingNotice { mission_id: None, .. })
        ));
    }

    #[test]
    fn server_events_use_camel_case_payloads() {
        let reader = Uuid::now_v7();
        let value = serde_json::to_value(ServerEvent::MessagesRead { read_by: reader, mission_id: None }).unwrap();
        assert_eq!(
            value,
            json!({ "event": "messages_read", "data": { "readBy": reader, "missionId": null } })
        );

        let value = serde_json::to_value(ServerEvent::UnreadCount { count: 3 }).unwrap();
        assert_eq!(value, json!({ "event": "unread_count", "data": { "count": 3 } }));
    }

    #[test]
    fn unknown_event_is_rejected() {
        let frame = json!({ "event": "delete_message", "data": {} });
        assert!(serde_json::from_value::<ClientEvent>(frame).is_err());
    }
}

//! WebSocket event DTOs.
//!
//! Every frame is a JSON text frame of the form
//! `{"event": "<name>", "data": {...}}`.

use serde::{Deserialize, Serialize};

/// Client → Server events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "chat:join")]
    Join(RoomRequest),
    #[serde(rename = "chat:leave")]
    Leave(RoomRequest),
}

/// Payload of `chat:join` / `chat:leave`.
///
/// `chatId` is kept as a raw JSON value so that a malformed identifier does
/// not fail the whole frame; validation happens in the conversion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRequest {
    #[serde(rename = "chatId", default)]
    pub chat_id: serde_json::Value,
}

/// Server → Client events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "message:new")]
    MessageNew(MessageDto),
}

/// A persisted message as delivered over the live channel and the history API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: i64,
    pub chat_id: i64,
    pub sender_user_id: i64,
    pub sender_avatar_url: Option<String>,
    pub sender_username: String,
    pub content: String,
    /// RFC 3339 with millisecond precision
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_event_wire_format() {
        // テスト項目: chat:join がイベント名と data で表現される
        // given (前提条件):
        let event = ClientEvent::Join(RoomRequest {
            chat_id: serde_json::json!(7),
        });

        // when (操作):
        let json = serde_json::to_value(&event).unwrap();

        // then (期待する結果):
        assert_eq!(
            json,
            serde_json::json!({"event": "chat:join", "data": {"chatId": 7}})
        );
    }

    #[test]
    fn test_leave_event_parses_with_missing_chat_id() {
        // テスト項目: chatId が欠落していてもフレーム自体はパースできる
        // when (操作):
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"chat:leave","data":{}}"#).unwrap();

        // then (期待する結果):
        assert_eq!(
            event,
            ClientEvent::Leave(RoomRequest {
                chat_id: serde_json::Value::Null
            })
        );
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        // テスト項目: プロトコル外のイベントはパースエラーになる
        // when (操作):
        let result = serde_json::from_str::<ClientEvent>(r#"{"event":"chat:shout","data":{}}"#);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_message_new_uses_camel_case_fields() {
        // テスト項目: message:new のペイロードは camelCase のフィールド名になる
        // given (前提条件):
        let event = ServerEvent::MessageNew(MessageDto {
            id: 1,
            chat_id: 3,
            sender_user_id: 9,
            sender_avatar_url: None,
            sender_username: "alice".to_string(),
            content: "hi".to_string(),
            created_at: "2023-01-01T00:00:00.000Z".to_string(),
        });

        // when (操作):
        let json = serde_json::to_value(&event).unwrap();

        // then (期待する結果):
        assert_eq!(json["event"], "message:new");
        assert_eq!(json["data"]["chatId"], 3);
        assert_eq!(json["data"]["senderUserId"], 9);
        assert_eq!(json["data"]["senderUsername"], "alice");
        assert!(json["data"]["senderAvatarUrl"].is_null());
        assert_eq!(json["data"]["createdAt"], "2023-01-01T00:00:00.000Z");
    }
}

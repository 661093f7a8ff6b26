//! Conversion logic between DTOs and domain entities.

use hiroba_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    ChatId, ChatListPage, ChatSummary, Message, MessagePage, PushEvent, UserSummary,
};
use crate::infrastructure::dto::{http, websocket as ws};

// ========================================
// DTO → Domain
// ========================================

impl ws::RoomRequest {
    /// Extract the room identifier.
    ///
    /// Accepts a JSON integer or a decimal string. Anything else (missing,
    /// fractional, non-positive, wrong type) is malformed and yields `None`.
    pub fn chat_id(&self) -> Option<ChatId> {
        match &self.chat_id {
            serde_json::Value::Number(n) => n.as_i64().and_then(|v| ChatId::new(v).ok()),
            serde_json::Value::String(s) => s.parse::<ChatId>().ok(),
            _ => None,
        }
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<&Message> for ws::MessageDto {
    fn from(model: &Message) -> Self {
        Self {
            id: model.id.value(),
            chat_id: model.chat_id.value(),
            sender_user_id: model.sender.id.value(),
            sender_avatar_url: model.sender.avatar_url.clone(),
            sender_username: model.sender.username.clone(),
            content: model.content.as_str().to_string(),
            created_at: timestamp_to_rfc3339(model.created_at.value()),
        }
    }
}

impl From<&PushEvent> for ws::ServerEvent {
    fn from(event: &PushEvent) -> Self {
        match event {
            PushEvent::NewMessage(message) => ws::ServerEvent::MessageNew(message.into()),
        }
    }
}

impl From<&UserSummary> for http::UserSummaryDto {
    fn from(model: &UserSummary) -> Self {
        Self {
            id: model.id.value(),
            username: model.username.clone(),
            avatar_url: model.avatar_url.clone(),
        }
    }
}

impl From<&ChatSummary> for http::ChatSummaryDto {
    fn from(model: &ChatSummary) -> Self {
        Self {
            id: model.id.value(),
            counterpart: (&model.counterpart).into(),
            created_at: timestamp_to_rfc3339(model.created_at.value()),
            last_message: model.last_message.as_ref().map(Into::into),
            unread: model.unread,
        }
    }
}

impl From<ChatListPage> for http::ChatListDto {
    fn from(page: ChatListPage) -> Self {
        Self {
            chats: page.chats.iter().map(Into::into).collect(),
            total: page.total,
        }
    }
}

impl From<MessagePage> for http::MessagePageDto {
    fn from(page: MessagePage) -> Self {
        Self {
            messages: page.messages.iter().map(Into::into).collect(),
            next_cursor: page.next_cursor.map(|cursor| cursor.encode()),
        }
    }
}

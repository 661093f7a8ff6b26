//! Client-side message model.

use hiroba_server::infrastructure::dto::websocket::MessageDto;
use hiroba_shared::time::rfc3339_to_timestamp;

use crate::error::ClientError;

/// A confirmed message, as received from history or the live channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: i64,
    pub chat_id: i64,
    pub sender_user_id: i64,
    pub sender_username: String,
    pub sender_avatar_url: Option<String>,
    pub content: String,
    /// Unix milliseconds (UTC)
    pub created_at: i64,
}

impl ChatMessage {
    /// Display order key: `(createdAt, id)` ascending
    pub fn sort_key(&self) -> (i64, i64) {
        (self.created_at, self.id)
    }
}

impl TryFrom<MessageDto> for ChatMessage {
    type Error = ClientError;

    fn try_from(dto: MessageDto) -> Result<Self, Self::Error> {
        let created_at = rfc3339_to_timestamp(&dto.created_at).ok_or_else(|| {
            ClientError::Decode(format!(
                "message {} has invalid createdAt '{}'",
                dto.id, dto.created_at
            ))
        })?;
        Ok(Self {
            id: dto.id,
            chat_id: dto.chat_id,
            sender_user_id: dto.sender_user_id,
            sender_username: dto.sender_username,
            sender_avatar_url: dto.sender_avatar_url,
            content: dto.content,
            created_at,
        })
    }
}

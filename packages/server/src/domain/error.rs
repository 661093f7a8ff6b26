//! Domain error types.

use thiserror::Error;

/// Value Object の生成失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("Invalid chat id: '{0}'")]
    InvalidChatId(String),

    #[error("Invalid user id: {0}")]
    InvalidUserId(i64),

    #[error("Invalid message id: {0}")]
    InvalidMessageId(i64),

    #[error("Invalid cursor: '{0}'")]
    InvalidCursor(String),

    #[error("Message content must not be empty")]
    EmptyMessageContent,
}

/// Errors reported by the message storage and chat list collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Content is empty or exceeds the configured maximum length
    #[error("Validation error: {0}")]
    Validation(String),

    /// Chat does not exist or the user is not a member of it
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend could not serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Session lookup failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Missing session token")]
    MissingToken,

    #[error("Invalid or expired session token")]
    InvalidToken,
}

/// メッセージ送信（プッシュ）の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("Failed to serialize push event: {0}")]
    Serialization(String),

    #[error("Connection '{0}' is not registered")]
    ConnectionNotFound(String),

    #[error("Push failed: {0}")]
    PushFailed(String),
}

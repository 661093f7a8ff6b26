//! UseCase 層のエラー定義

use thiserror::Error;

/// 接続確立のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// ルーム参加のエラー
///
/// どのエラーも接続を切断する理由にはならない（呼び出し側でログを出して無視する）。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinRoomError {
    #[error("User is not a member of chat {0}")]
    NotAMember(i64),

    #[error("Chat directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

/// ブロードキャストのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    #[error("Broadcast failed: {0}")]
    PushFailed(String),
}

/// メッセージ送信のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error("Invalid message: {0}")]
    Validation(String),

    #[error("Chat not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

/// 履歴取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchHistoryError {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Chat not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

/// 既読化のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkReadError {
    #[error("Chat not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

/// チャット一覧取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListChatsError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

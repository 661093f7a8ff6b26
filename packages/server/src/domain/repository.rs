//! Repository / Collaborator trait 定義
//!
//! ドメイン層・UseCase 層が必要とする外部協調者へのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! - `SessionResolver`: 認証セッションからユーザーを特定する
//! - `MessageStore`: メッセージの永続化・履歴取得・既読化
//! - `ChatDirectory`: チャット一覧とメンバー判定
//! - `MembershipRepository`: 接続とルームのメンバーシップ表

use async_trait::async_trait;

use super::{
    ChatId, ChatListPage, ConnectionId, Cursor, Message, MessageContent, MessagePage,
    SessionError, StoreError, UserId,
};

/// Session/Auth collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// トークンから認証済みユーザー ID を取得
    async fn resolve(&self, token: &str) -> Result<UserId, SessionError>;
}

/// Message storage collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// メッセージを永続化し、採番済みのメッセージを返す
    ///
    /// - 本文が設定上限を超える場合は `StoreError::Validation`
    /// - チャットが存在しない、または送信者がメンバーでない場合は `StoreError::NotFound`
    async fn create_message(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        content: MessageContent,
    ) -> Result<Message, StoreError>;

    /// 履歴を 1 ページ取得（新しい順）
    ///
    /// `cursor` が `None` の場合は最新ページ。
    async fn list_messages(
        &self,
        chat_id: ChatId,
        cursor: Option<Cursor>,
    ) -> Result<MessagePage, StoreError>;

    /// 既読化（冪等）
    async fn mark_read(&self, chat_id: ChatId, user_id: UserId) -> Result<(), StoreError>;
}

/// Chat list collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    /// ユーザーが参加しているチャット一覧（最近の活動順）
    async fn list_chats(
        &self,
        user_id: UserId,
        page_offset: usize,
    ) -> Result<ChatListPage, StoreError>;

    /// ユーザーがチャットのメンバーかどうか
    async fn is_member(&self, chat_id: ChatId, user_id: UserId) -> Result<bool, StoreError>;
}

/// 接続とルームのメンバーシップ表
///
/// 全操作は 1 回のロック区間で完結し、同じルームのメンバー集合が
/// 途中の状態で観測されることはない。
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// 参加（冪等）。新規参加なら `true`
    async fn join(&self, connection_id: ConnectionId, chat_id: ChatId) -> bool;

    /// 退出（冪等）。実際に外れたら `true`
    async fn leave(&self, connection_id: ConnectionId, chat_id: ChatId) -> bool;

    /// 全ルームから退出し、外れたルームを返す
    async fn leave_all(&self, connection_id: ConnectionId) -> Vec<ChatId>;

    /// ルームの現在のメンバー
    async fn members(&self, chat_id: ChatId) -> Vec<ConnectionId>;

    /// 接続が参加中のルーム
    async fn rooms_of(&self, connection_id: ConnectionId) -> Vec<ChatId>;

    /// アクティブなルーム数
    async fn count_rooms(&self) -> usize;
}

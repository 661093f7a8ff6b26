//! Entity 定義

use super::value_object::{ChatId, ConnectionId, Cursor, MessageContent, MessageId, Timestamp, UserId};

/// ユーザーの表示用サマリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// 永続化済みのチャットメッセージ
///
/// ストレージが ID と作成時刻を確定させた後のメッセージです。
/// ブロードキャスト後は不変として扱います。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender: UserSummary,
    pub content: MessageContent,
    pub created_at: Timestamp,
}

/// 履歴の 1 ページ
///
/// `messages` は新しい順。`next_cursor` が `None` の場合はこれ以上古い履歴が存在しない。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub next_cursor: Option<Cursor>,
}

/// チャット一覧の 1 エントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub id: ChatId,
    pub counterpart: UserSummary,
    pub created_at: Timestamp,
    pub last_message: Option<Message>,
    pub unread: u32,
}

/// チャット一覧の 1 ページ
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatListPage {
    pub chats: Vec<ChatSummary>,
    pub total: usize,
}

/// 認証済みの接続
///
/// ユーザー ID は接続確立時にセッションから確定し、イベントごとには再検証しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub connected_at: Timestamp,
}

/// 接続に向けてプッシュするイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// `message:new`
    NewMessage(Message),
}

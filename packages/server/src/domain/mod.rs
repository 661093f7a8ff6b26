//! ドメイン層
//!
//! 値オブジェクト・エンティティ・ルームメンバーシップモデルと、
//! 外部協調者へのインターフェース（trait）を定義します。

pub mod entity;
pub mod error;
pub mod membership;
pub mod pusher;
pub mod repository;
pub mod value_object;

pub use entity::{
    ChatListPage, ChatSummary, Connection, Message, MessagePage, PushEvent, UserSummary,
};
pub use error::{MessagePushError, SessionError, StoreError, ValueObjectError};
pub use membership::RoomMembership;
pub use pusher::{BroadcastReport, MessagePusher, PusherChannel};
pub use repository::{ChatDirectory, MembershipRepository, MessageStore, SessionResolver};
pub use value_object::{
    ChatId, ConnectionId, Cursor, MessageContent, MessageId, Timestamp, UserId,
};

#[cfg(test)]
pub use repository::{MockChatDirectory, MockMessageStore, MockSessionResolver};

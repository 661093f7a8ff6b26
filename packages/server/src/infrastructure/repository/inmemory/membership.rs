//! InMemory Membership Repository 実装
//!
//! `RoomMembership` ドメインモデルを 1 つの Mutex で保護します。
//! 各操作はロック区間内で完結するため、同じルームのメンバー集合が
//! 並行に変更されることはありません。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ChatId, ConnectionId, MembershipRepository, RoomMembership};

pub struct InMemoryMembershipRepository {
    membership: Arc<Mutex<RoomMembership>>,
}

impl InMemoryMembershipRepository {
    pub fn new() -> Self {
        Self {
            membership: Arc::new(Mutex::new(RoomMembership::new())),
        }
    }
}

impl Default for InMemoryMembershipRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipRepository for InMemoryMembershipRepository {
    async fn join(&self, connection_id: ConnectionId, chat_id: ChatId) -> bool {
        self.membership.lock().await.join(connection_id, chat_id)
    }

    async fn leave(&self, connection_id: ConnectionId, chat_id: ChatId) -> bool {
        self.membership.lock().await.leave(connection_id, chat_id)
    }

    async fn leave_all(&self, connection_id: ConnectionId) -> Vec<ChatId> {
        self.membership.lock().await.leave_all(connection_id)
    }

    async fn members(&self, chat_id: ChatId) -> Vec<ConnectionId> {
        self.membership.lock().await.members(chat_id)
    }

    async fn rooms_of(&self, connection_id: ConnectionId) -> Vec<ChatId> {
        self.membership.lock().await.rooms_of(connection_id)
    }

    async fn count_rooms(&self) -> usize {
        self.membership.lock().await.room_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_leave_through_repository() {
        // テスト項目: Repository 経由の参加・退出がモデルに反映される
        // given (前提条件):
        let repo = InMemoryMembershipRepository::new();
        let conn = ConnectionId::generate();
        let chat_id = ChatId::new(7).unwrap();

        // when (操作):
        assert!(repo.join(conn, chat_id).await);
        let members = repo.members(chat_id).await;
        assert!(repo.leave(conn, chat_id).await);

        // then (期待する結果):
        assert_eq!(members, vec![conn]);
        assert!(repo.members(chat_id).await.is_empty());
        assert_eq!(repo.count_rooms().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_joins_are_not_lost() {
        // テスト項目: 並行した参加操作がすべて反映される
        // given (前提条件):
        let repo = Arc::new(InMemoryMembershipRepository::new());
        let chat_id = ChatId::new(1).unwrap();
        let connections: Vec<ConnectionId> = (0..32).map(|_| ConnectionId::generate()).collect();

        // when (操作):
        let handles: Vec<_> = connections
            .iter()
            .map(|conn| {
                let repo = repo.clone();
                let conn = *conn;
                tokio::spawn(async move { repo.join(conn, chat_id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // then (期待する結果):
        assert_eq!(repo.members(chat_id).await.len(), 32);
    }
}

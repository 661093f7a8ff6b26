//! UseCase: メッセージのファンアウト
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - BroadcastMessageUseCase::execute() のルーム単位の配信
//!
//! ### なぜこのテストが必要か
//! - ルーム A への配信がルーム B のメンバーに届かないこと（ルーム分離）を保証
//! - 配信時点で参加していない接続は受信しない（取りこぼしは履歴で回復する）
//!
//! ### どのような状況を想定しているか
//! - 正常系：複数ルームに分かれた接続への配信
//! - エッジケース：メンバーのいないルーム、切断済みの接続

use std::sync::Arc;

use crate::domain::{BroadcastReport, MembershipRepository, Message, MessagePusher, PushEvent};

use super::error::BroadcastError;

/// ブロードキャストのユースケース
pub struct BroadcastMessageUseCase {
    membership: Arc<dyn MembershipRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl BroadcastMessageUseCase {
    pub fn new(
        membership: Arc<dyn MembershipRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            membership,
            message_pusher,
        }
    }

    /// メッセージの所属ルームに参加中の全接続へ `message:new` を配信
    ///
    /// 接続ごとに最大 1 回。再送・ACK は行わない。
    pub async fn execute(&self, message: &Message) -> Result<BroadcastReport, BroadcastError> {
        let targets = self.membership.members(message.chat_id).await;
        if targets.is_empty() {
            tracing::debug!("No connections joined to chat {}", message.chat_id);
            return Ok(BroadcastReport::default());
        }

        let event = PushEvent::NewMessage(message.clone());
        let report = self
            .message_pusher
            .broadcast(&targets, &event)
            .await
            .map_err(|e| BroadcastError::PushFailed(e.to_string()))?;

        tracing::debug!(
            "Broadcast message {} to chat {}: delivered={}, skipped={}",
            message.id.value(),
            message.chat_id,
            report.delivered,
            report.skipped
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            ChatId, ConnectionId, MessageContent, MessageId, Timestamp, UserId, UserSummary,
        },
        infrastructure::{
            dto::websocket::ServerEvent, message_pusher::WebSocketMessagePusher,
            repository::InMemoryMembershipRepository,
        },
    };
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn message(id: i64, chat: i64) -> Message {
        Message {
            id: MessageId::new(id).unwrap(),
            chat_id: ChatId::new(chat).unwrap(),
            sender: UserSummary {
                id: UserId::new(1).unwrap(),
                username: "alice".to_string(),
                avatar_url: None,
            },
            content: MessageContent::new(format!("message {}", id)).unwrap(),
            created_at: Timestamp::new(1_000 + id),
        }
    }

    struct Fixture {
        usecase: BroadcastMessageUseCase,
        membership: Arc<InMemoryMembershipRepository>,
        pusher: Arc<WebSocketMessagePusher>,
    }

    fn fixture() -> Fixture {
        let membership = Arc::new(InMemoryMembershipRepository::new());
        let pusher = Arc::new(WebSocketMessagePusher::new());
        Fixture {
            usecase: BroadcastMessageUseCase::new(membership.clone(), pusher.clone()),
            membership,
            pusher,
        }
    }

    async fn connect(f: &Fixture, chat: i64) -> (ConnectionId, UnboundedReceiver<String>) {
        let id = ConnectionId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        f.pusher.register_connection(id, tx).await;
        f.membership.join(id, ChatId::new(chat).unwrap()).await;
        (id, rx)
    }

    fn received_ids(rx: &mut UnboundedReceiver<String>) -> Vec<i64> {
        let mut ids = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            match serde_json::from_str::<ServerEvent>(&frame).unwrap() {
                ServerEvent::MessageNew(dto) => ids.push(dto.id),
            }
        }
        ids
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        // テスト項目: ルーム A への配信はルーム B のメンバーに届かない
        // given (前提条件):
        let f = fixture();
        let (_, mut in_a) = connect(&f, 10).await;
        let (_, mut in_b) = connect(&f, 20).await;

        // when (操作):
        let report = f.usecase.execute(&message(1, 10)).await.unwrap();

        // then (期待する結果):
        assert_eq!(report.delivered, 1);
        assert_eq!(received_ids(&mut in_a), vec![1]);
        assert!(received_ids(&mut in_b).is_empty());
    }

    #[tokio::test]
    async fn test_publish_order_is_preserved_per_room() {
        // テスト項目: 同じルームのメンバーは publish 順に受信する
        // given (前提条件):
        let f = fixture();
        let (_, mut first) = connect(&f, 3).await;
        let (_, mut second) = connect(&f, 3).await;

        // when (操作):
        for id in 1..=5 {
            f.usecase.execute(&message(id, 3)).await.unwrap();
        }

        // then (期待する結果):
        assert_eq!(received_ids(&mut first), vec![1, 2, 3, 4, 5]);
        assert_eq!(received_ids(&mut second), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_connection_joined_later_misses_earlier_events() {
        // テスト項目: publish 時点で参加していない接続は受信しない
        // given (前提条件):
        let f = fixture();
        let (_, mut early) = connect(&f, 3).await;
        f.usecase.execute(&message(1, 3)).await.unwrap();

        // when (操作):
        let (_, mut late) = connect(&f, 3).await;
        f.usecase.execute(&message(2, 3)).await.unwrap();

        // then (期待する結果):
        assert_eq!(received_ids(&mut early), vec![1, 2]);
        assert_eq!(received_ids(&mut late), vec![2]);
    }

    #[tokio::test]
    async fn test_closed_connection_does_not_affect_others() {
        // テスト項目: 受信側が閉じた接続があっても他のメンバーには届く
        // given (前提条件):
        let f = fixture();
        let (_, closed) = connect(&f, 3).await;
        let (_, mut alive) = connect(&f, 3).await;
        drop(closed);

        // when (操作):
        let report = f.usecase.execute(&message(1, 3)).await.unwrap();

        // then (期待する結果):
        assert_eq!(report.delivered, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(received_ids(&mut alive), vec![1]);
    }

    #[tokio::test]
    async fn test_empty_room_is_noop() {
        // テスト項目: メンバーのいないルームへの配信は何もしない
        // given (前提条件):
        let f = fixture();

        // when (操作):
        let report = f.usecase.execute(&message(1, 99)).await;

        // then (期待する結果):
        assert_eq!(report, Ok(BroadcastReport::default()));
    }
}

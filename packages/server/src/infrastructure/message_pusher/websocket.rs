//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` を管理
//! - `PushEvent` を `ServerEvent` にシリアライズして配信
//!
//! ## 順序保証
//!
//! `broadcast` はシリアライズ後、送信チャンネル表のロックを保持したまま全対象に積む。
//! 各接続のチャンネルは FIFO で単一の writer タスクが読み出すため、
//! 同じルームへの配信はすべてのメンバーに同じ相対順序で届く。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    BroadcastReport, ConnectionId, MessagePushError, MessagePusher, PushEvent, PusherChannel,
};
use crate::infrastructure::dto::websocket::ServerEvent;

pub struct WebSocketMessagePusher {
    /// Key: ConnectionId, Value: 送信チャンネル
    connections: Arc<Mutex<HashMap<ConnectionId, PusherChannel>>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn serialize(event: &PushEvent) -> Result<String, MessagePushError> {
        serde_json::to_string(&ServerEvent::from(event))
            .map_err(|e| MessagePushError::Serialization(e.to_string()))
    }
}

impl Default for WebSocketMessagePusher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_connection(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut connections = self.connections.lock().await;
        connections.insert(connection_id, sender);
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
    }

    async fn unregister_connection(&self, connection_id: &ConnectionId) {
        let mut connections = self.connections.lock().await;
        connections.remove(connection_id);
        tracing::debug!(
            "Connection '{}' unregistered from MessagePusher",
            connection_id
        );
    }

    async fn broadcast(
        &self,
        targets: &[ConnectionId],
        event: &PushEvent,
    ) -> Result<BroadcastReport, MessagePushError> {
        let payload = Self::serialize(event)?;
        let connections = self.connections.lock().await;
        let mut report = BroadcastReport::default();

        for target in targets {
            match connections.get(target) {
                Some(sender) => {
                    // ブロードキャストでは一部の送信失敗を許容
                    if let Err(e) = sender.send(payload.clone()) {
                        tracing::warn!("Failed to push event to connection '{}': {}", target, e);
                        report.skipped += 1;
                    } else {
                        report.delivered += 1;
                    }
                }
                None => {
                    tracing::warn!(
                        "Connection '{}' not found during broadcast, skipping",
                        target
                    );
                    report.skipped += 1;
                }
            }
        }

        Ok(report)
    }

    async fn count_connections(&self) -> usize {
        self.connections.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ChatId, Message, MessageContent, MessageId, Timestamp, UserId, UserSummary,
    };
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - WebSocketMessagePusher の配信機能
    // - broadcast: 複数接続への配信と部分失敗の許容
    // - 登録・登録解除
    //
    // 【なぜこのテストが必要か】
    // - ルームへのファンアウトはこの実装を経由する
    // - 切断済みの接続があっても他のメンバーに届くことを保証する
    // ========================================

    fn new_message_event(id: i64, content: &str) -> PushEvent {
        PushEvent::NewMessage(Message {
            id: MessageId::new(id).unwrap(),
            chat_id: ChatId::new(3).unwrap(),
            sender: UserSummary {
                id: UserId::new(1).unwrap(),
                username: "alice".to_string(),
                avatar_url: None,
            },
            content: MessageContent::new(content.to_string()).unwrap(),
            created_at: Timestamp::new(1000),
        })
    }

    #[tokio::test]
    async fn test_broadcast_success() {
        // テスト項目: 複数の接続に message:new を配信できる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let alice = ConnectionId::generate();
        let bob = ConnectionId::generate();
        pusher.register_connection(alice, tx1).await;
        pusher.register_connection(bob, tx2).await;

        // when (操作):
        let report = pusher
            .broadcast(&[alice, bob], &new_message_event(1, "hello"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 2,
                skipped: 0
            }
        );
        for rx in [&mut rx1, &mut rx2] {
            let frame = rx.recv().await.unwrap();
            let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(json["event"], "message:new");
            assert_eq!(json["data"]["content"], "hello");
            assert_eq!(json["data"]["chatId"], 3);
        }
    }

    #[tokio::test]
    async fn test_broadcast_partial_failure() {
        // テスト項目: 未登録・切断済みの接続があっても他の接続には届く
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx_alive, mut rx_alive) = mpsc::unbounded_channel();
        let (tx_closed, rx_closed) = mpsc::unbounded_channel();
        drop(rx_closed);
        let alive = ConnectionId::generate();
        let closed = ConnectionId::generate();
        let unknown = ConnectionId::generate();
        pusher.register_connection(alive, tx_alive).await;
        pusher.register_connection(closed, tx_closed).await;

        // when (操作):
        let report = pusher
            .broadcast(&[closed, unknown, alive], &new_message_event(1, "hello"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(report.delivered, 1);
        assert_eq!(report.skipped, 2);
        assert!(rx_alive.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_broadcast_preserves_publish_order() {
        // テスト項目: 連続した配信は同じ順序で届く
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = ConnectionId::generate();
        pusher.register_connection(conn, tx).await;

        // when (操作):
        for id in 1..=5 {
            pusher
                .broadcast(&[conn], &new_message_event(id, &format!("m{}", id)))
                .await
                .unwrap();
        }

        // then (期待する結果):
        for id in 1..=5 {
            let frame = rx.recv().await.unwrap();
            let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(json["data"]["id"], id);
        }
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery() {
        // テスト項目: 登録解除後の接続には配信されない
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = ConnectionId::generate();
        pusher.register_connection(conn, tx).await;

        // when (操作):
        pusher.unregister_connection(&conn).await;
        let report = pusher
            .broadcast(&[conn], &new_message_event(1, "hello"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(report.delivered, 0);
        assert_eq!(pusher.count_connections().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_empty_targets() {
        // テスト項目: 空のターゲットリストでもエラーにならない
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();

        // when (操作):
        let result = pusher.broadcast(&[], &new_message_event(1, "x")).await;

        // then (期待する結果):
        assert_eq!(result, Ok(BroadcastReport::default()));
    }
}

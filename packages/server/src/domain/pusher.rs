//! MessagePusher trait 定義
//!
//! 接続へのイベント配信を抽象化します。
//! UseCase 層はこの trait に依存し、WebSocket などの具体的な実装には依存しません。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, MessagePushError, PushEvent};

/// 接続ごとの送信チャンネル（シリアライズ済みのテキストフレーム）
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// ブロードキャスト 1 回分の配信結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    /// 送信チャンネルに積めた接続数
    pub delivered: usize,
    /// 未登録・切断済みで配信できなかった接続数
    pub skipped: usize,
}

#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信チャンネルを登録
    async fn register_connection(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続の送信チャンネルを登録解除
    async fn unregister_connection(&self, connection_id: &ConnectionId);

    /// 複数の接続にイベントを配信する
    ///
    /// 配信は接続ごとに最大 1 回。再送・ACK 追跡は行わない。
    /// 一部の接続への配信失敗はエラーにせず `BroadcastReport::skipped` に数える。
    async fn broadcast(
        &self,
        targets: &[ConnectionId],
        event: &PushEvent,
    ) -> Result<BroadcastReport, MessagePushError>;

    /// 登録中の接続数
    async fn count_connections(&self) -> usize;
}

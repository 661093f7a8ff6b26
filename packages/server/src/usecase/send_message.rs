//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 永続化してからルームへブロードキャストする一連の流れ
//!
//! ### なぜこのテストが必要か
//! - 永続化に失敗した場合にブロードキャストが行われないことを保証
//! - 送信者自身の接続にもエコーが届くことを確認（クライアントの照合に使われる）
//! - ストレージのエラーが送信者にだけ返ることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：メッセージ送信とブロードキャスト
//! - 異常系：空の本文、上限超過、存在しないチャット、ストレージ障害
//! - エッジケース：ブロードキャストの失敗（送信自体は成功扱い）

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{ChatId, Message, MessageContent, MessageStore, StoreError, UserId};

use super::{broadcast_message::BroadcastMessageUseCase, error::SendMessageError};

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// MessageStore（永続化の抽象化）
    store: Arc<dyn MessageStore>,
    broadcaster: Arc<BroadcastMessageUseCase>,
    /// 永続化とブロードキャストを 1 区間で行い、採番順と publish 順を一致させる
    publish_lock: Mutex<()>,
}

impl SendMessageUseCase {
    pub fn new(store: Arc<dyn MessageStore>, broadcaster: Arc<BroadcastMessageUseCase>) -> Self {
        Self {
            store,
            broadcaster,
            publish_lock: Mutex::new(()),
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `chat_id` - 送信先チャット
    /// * `sender_id` - 認証済みの送信者
    /// * `content` - 本文（未検証）
    ///
    /// # Returns
    ///
    /// * `Ok(Message)` - 永続化されたメッセージ（採番済み ID・作成時刻を含む）
    /// * `Err(SendMessageError)` - 送信失敗（ブロードキャストは行われていない）
    pub async fn execute(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        content: String,
    ) -> Result<Message, SendMessageError> {
        let content =
            MessageContent::new(content).map_err(|e| SendMessageError::Validation(e.to_string()))?;

        let _guard = self.publish_lock.lock().await;

        // 1. 永続化
        let message = self
            .store
            .create_message(chat_id, sender_id, content)
            .await
            .map_err(|e| match e {
                StoreError::Validation(msg) => SendMessageError::Validation(msg),
                StoreError::NotFound(msg) => SendMessageError::NotFound(msg),
                StoreError::Unavailable(msg) => SendMessageError::StoreUnavailable(msg),
            })?;

        // 2. ルームへブロードキャスト
        if let Err(e) = self.broadcaster.execute(&message).await {
            tracing::warn!(
                "Message {} was stored but broadcast failed: {}",
                message.id.value(),
                e
            );
        }

        Ok(message)
    }
}

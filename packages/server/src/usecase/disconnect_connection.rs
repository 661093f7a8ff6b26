//! UseCase: 切断処理
//!
//! 切断された接続を全ルームから外し（暗黙の leave-all）、配信対象から登録解除します。
//! 他の接続への通知は行いません。

use std::sync::Arc;

use crate::domain::{ChatId, Connection, MembershipRepository, MessagePusher};

/// 切断のユースケース
pub struct DisconnectConnectionUseCase {
    membership: Arc<dyn MembershipRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectConnectionUseCase {
    pub fn new(
        membership: Arc<dyn MembershipRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            membership,
            message_pusher,
        }
    }

    /// 切断を実行
    ///
    /// # Returns
    ///
    /// 接続が参加していたルーム ID の一覧（昇順）
    pub async fn execute(&self, connection: &Connection) -> Vec<ChatId> {
        let left = self.membership.leave_all(connection.id).await;
        self.message_pusher
            .unregister_connection(&connection.id)
            .await;
        left
    }
}

//! UseCase: ルーム退出（chat:leave）

use std::sync::Arc;

use crate::domain::{ChatId, Connection, MembershipRepository};

/// ルーム退出のユースケース
pub struct LeaveRoomUseCase {
    membership: Arc<dyn MembershipRepository>,
}

impl LeaveRoomUseCase {
    pub fn new(membership: Arc<dyn MembershipRepository>) -> Self {
        Self { membership }
    }

    /// ルームから退出する（冪等）
    ///
    /// 実際に退出した場合のみ `true`。
    pub async fn execute(&self, connection: &Connection, chat_id: ChatId) -> bool {
        self.membership.leave(connection.id, chat_id).await
    }
}

//! UseCase: ルーム参加（chat:join）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() の参加ポリシーごとの挙動
//!
//! ### なぜこのテストが必要か
//! - `members-only` ではチャットのメンバー以外がブロードキャストを受信できないことを保証
//! - `open` では参加時に一切の検証を行わないことを確認
//! - 参加は冪等であることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：メンバーの参加、2 回目の参加
//! - 異常系：非メンバーの参加、ディレクトリ障害

use std::sync::Arc;

use crate::config::JoinPolicy;
use crate::domain::{ChatDirectory, ChatId, Connection, MembershipRepository};

use super::error::JoinRoomError;

/// 参加結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyJoined,
}

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    membership: Arc<dyn MembershipRepository>,
    directory: Arc<dyn ChatDirectory>,
    policy: JoinPolicy,
}

impl JoinRoomUseCase {
    pub fn new(
        membership: Arc<dyn MembershipRepository>,
        directory: Arc<dyn ChatDirectory>,
        policy: JoinPolicy,
    ) -> Self {
        Self {
            membership,
            directory,
            policy,
        }
    }

    /// ルームに参加する
    ///
    /// # Returns
    ///
    /// * `Ok(JoinOutcome)` - 参加済み（冪等）
    /// * `Err(JoinRoomError)` - ポリシーにより拒否（接続は維持される）
    pub async fn execute(
        &self,
        connection: &Connection,
        chat_id: ChatId,
    ) -> Result<JoinOutcome, JoinRoomError> {
        if self.policy == JoinPolicy::MembersOnly {
            let is_member = self
                .directory
                .is_member(chat_id, connection.user_id)
                .await
                .map_err(|e| JoinRoomError::DirectoryUnavailable(e.to_string()))?;
            if !is_member {
                return Err(JoinRoomError::NotAMember(chat_id.value()));
            }
        }

        if self.membership.join(connection.id, chat_id).await {
            Ok(JoinOutcome::Joined)
        } else {
            Ok(JoinOutcome::AlreadyJoined)
        }
    }
}

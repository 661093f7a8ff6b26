//! UseCase: 接続確立
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectConnectionUseCase::authenticate() / register()
//!
//! ### なぜこのテストが必要か
//! - 認証に失敗した接続はアップグレード前に拒否される必要がある
//! - 登録した接続が MessagePusher の配信対象になることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：有効なトークンでの接続
//! - 異常系：不正・空のトークン

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::domain::{
    Connection, ConnectionId, MessagePusher, PusherChannel, SessionResolver, Timestamp, UserId,
};

use super::error::ConnectError;

/// 接続確立のユースケース
pub struct ConnectConnectionUseCase {
    /// SessionResolver（認証の抽象化）
    sessions: Arc<dyn SessionResolver>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ConnectConnectionUseCase {
    pub fn new(
        sessions: Arc<dyn SessionResolver>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            message_pusher,
            clock,
        }
    }

    /// セッショントークンからユーザーを特定する（アップグレード前）
    ///
    /// # Returns
    ///
    /// * `Ok(UserId)` - 認証成功
    /// * `Err(ConnectError::Unauthorized)` - トークンが無い・不正
    pub async fn authenticate(&self, token: Option<&str>) -> Result<UserId, ConnectError> {
        let token = token.unwrap_or_default();
        self.sessions
            .resolve(token)
            .await
            .map_err(|e| ConnectError::Unauthorized(e.to_string()))
    }

    /// アップグレード完了後、接続を登録する
    ///
    /// 接続 ID はここで払い出し、ユーザー ID は以後再検証しない。
    pub async fn register(&self, user_id: UserId, sender: PusherChannel) -> Connection {
        let connection = Connection {
            id: ConnectionId::generate(),
            user_id,
            connected_at: Timestamp::new(self.clock.now_millis()),
        };
        self.message_pusher
            .register_connection(connection.id, sender)
            .await;
        connection
    }
}

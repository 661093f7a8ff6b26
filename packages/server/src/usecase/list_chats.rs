//! UseCase: チャット一覧取得

use std::sync::Arc;

use crate::domain::{ChatDirectory, ChatListPage, UserId};

use super::error::ListChatsError;

pub struct ListChatsUseCase {
    directory: Arc<dyn ChatDirectory>,
}

impl ListChatsUseCase {
    pub fn new(directory: Arc<dyn ChatDirectory>) -> Self {
        Self { directory }
    }

    /// 最近の活動順にチャット一覧を取得する（`page` は 0 始まり）
    pub async fn execute(
        &self,
        user_id: UserId,
        page: usize,
    ) -> Result<ChatListPage, ListChatsError> {
        self.directory
            .list_chats(user_id, page)
            .await
            .map_err(|e| ListChatsError::StoreUnavailable(e.to_string()))
    }
}

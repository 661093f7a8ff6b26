//! UseCase: 履歴取得（カーソルページング）

use std::sync::Arc;

use crate::domain::{ChatDirectory, ChatId, Cursor, MessagePage, MessageStore, StoreError, UserId};

use super::error::FetchHistoryError;

/// 履歴取得のユースケース
pub struct FetchHistoryUseCase {
    store: Arc<dyn MessageStore>,
    directory: Arc<dyn ChatDirectory>,
}

impl FetchHistoryUseCase {
    pub fn new(store: Arc<dyn MessageStore>, directory: Arc<dyn ChatDirectory>) -> Self {
        Self { store, directory }
    }

    /// 1 ページ分の履歴を取得する
    ///
    /// `cursor` が `None` または空文字列の場合は最新ページ。
    /// メンバーでないチャットは存在しないものとして扱う。
    pub async fn execute(
        &self,
        user_id: UserId,
        chat_id: ChatId,
        cursor: Option<&str>,
    ) -> Result<MessagePage, FetchHistoryError> {
        let cursor = match cursor.map(str::trim).filter(|c| !c.is_empty()) {
            Some(raw) => Some(
                raw.parse::<Cursor>()
                    .map_err(|e| FetchHistoryError::InvalidCursor(e.to_string()))?,
            ),
            None => None,
        };

        let is_member = self
            .directory
            .is_member(chat_id, user_id)
            .await
            .map_err(map_store_error)?;
        if !is_member {
            return Err(FetchHistoryError::NotFound(format!("chat {}", chat_id)));
        }

        self.store
            .list_messages(chat_id, cursor)
            .await
            .map_err(map_store_error)
    }
}

fn map_store_error(e: StoreError) -> FetchHistoryError {
    match e {
        StoreError::NotFound(msg) => FetchHistoryError::NotFound(msg),
        StoreError::Validation(msg) => FetchHistoryError::InvalidCursor(msg),
        StoreError::Unavailable(msg) => FetchHistoryError::StoreUnavailable(msg),
    }
}

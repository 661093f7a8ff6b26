//! UseCase: 既読化

use std::sync::Arc;

use crate::domain::{ChatId, MessageStore, StoreError, UserId};

use super::error::MarkReadError;

pub struct MarkReadUseCase {
    store: Arc<dyn MessageStore>,
}

impl MarkReadUseCase {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// チャットを既読にする（冪等）
    pub async fn execute(&self, chat_id: ChatId, user_id: UserId) -> Result<(), MarkReadError> {
        self.store
            .mark_read(chat_id, user_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(msg) | StoreError::Validation(msg) => {
                    MarkReadError::NotFound(msg)
                }
                StoreError::Unavailable(msg) => MarkReadError::StoreUnavailable(msg),
            })
    }
}

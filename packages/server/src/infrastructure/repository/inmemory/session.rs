//! InMemory Session Store 実装

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{SessionError, SessionResolver, UserId};

/// トークン → ユーザー ID の対応表
#[derive(Default)]
pub struct InMemorySessionStore {
    tokens: Mutex<HashMap<String, UserId>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しいトークンを発行する
    pub async fn issue(&self, user_id: UserId) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.insert(token.clone(), user_id).await;
        token
    }

    /// 既知のトークンを登録する（固定トークンでのデモ・テスト用）
    pub async fn insert(&self, token: String, user_id: UserId) {
        self.tokens.lock().await.insert(token, user_id);
    }

    pub async fn revoke(&self, token: &str) {
        self.tokens.lock().await.remove(token);
    }
}

#[async_trait]
impl SessionResolver for InMemorySessionStore {
    async fn resolve(&self, token: &str) -> Result<UserId, SessionError> {
        if token.trim().is_empty() {
            return Err(SessionError::MissingToken);
        }
        self.tokens
            .lock()
            .await
            .get(token)
            .copied()
            .ok_or(SessionError::InvalidToken)
    }
}

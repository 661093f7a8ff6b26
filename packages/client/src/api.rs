//! HTTP collaborator for history, chat list, send and mark-read.

use async_trait::async_trait;
use hiroba_server::infrastructure::dto::{
    http::{ChatListDto, ErrorDto, MessagePageDto, SendMessageRequest},
    websocket::MessageDto,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::ClientError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// チャット一覧（`page` は 0 始まり）
    async fn list_chats(&self, page: usize) -> Result<ChatListDto, ClientError>;

    /// 履歴 1 ページ（新しい順）。`cursor` が `None` なら最新ページ
    async fn list_messages(
        &self,
        chat_id: i64,
        cursor: Option<String>,
    ) -> Result<MessagePageDto, ClientError>;

    /// 送信。永続化されたメッセージを返す
    async fn send_message(&self, chat_id: i64, content: String)
    -> Result<MessageDto, ClientError>;

    /// 既読化
    async fn mark_read(&self, chat_id: i64) -> Result<(), ClientError>;
}

/// reqwest implementation with bearer token auth
pub struct HttpChatApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpChatApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<ErrorDto>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        if status == StatusCode::UNAUTHORIZED {
            Err(ClientError::Unauthorized(message))
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        Self::check(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn transport(e: reqwest::Error) -> ClientError {
    ClientError::ConnectionError(e.to_string())
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_chats(&self, page: usize) -> Result<ChatListDto, ClientError> {
        let response = self
            .client
            .get(self.url("/api/chats"))
            .bearer_auth(&self.token)
            .query(&[("page", page)])
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response).await
    }

    async fn list_messages(
        &self,
        chat_id: i64,
        cursor: Option<String>,
    ) -> Result<MessagePageDto, ClientError> {
        let mut request = self
            .client
            .get(self.url(&format!("/api/chats/{}/messages", chat_id)))
            .bearer_auth(&self.token);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        let response = request.send().await.map_err(transport)?;
        Self::decode(response).await
    }

    async fn send_message(
        &self,
        chat_id: i64,
        content: String,
    ) -> Result<MessageDto, ClientError> {
        let response = self
            .client
            .post(self.url(&format!("/api/chats/{}/messages", chat_id)))
            .bearer_auth(&self.token)
            .json(&SendMessageRequest { content })
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response).await
    }

    async fn mark_read(&self, chat_id: i64) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url(&format!("/api/chats/{}/read", chat_id)))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;
        Self::check(response).await.map(|_| ())
    }
}

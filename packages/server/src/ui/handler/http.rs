//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    domain::ChatId,
    infrastructure::dto::{
        http::{
            ChatListDto, ChatListQuery, ErrorDto, HealthDto, HistoryQuery, MessagePageDto,
            SendMessageRequest,
        },
        websocket::MessageDto,
    },
    ui::state::AppState,
    usecase::{FetchHistoryError, ListChatsError, MarkReadError, SendMessageError},
};

use super::auth::AuthenticatedUser;

/// Error response with a JSON `{"error": "..."}` body
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unprocessable(String),
    Unauthorized(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(m) => {
                tracing::error!("Internal error: {}", m);
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(ErrorDto { error: message })).into_response()
    }
}

impl From<SendMessageError> for ApiError {
    fn from(e: SendMessageError) -> Self {
        match e {
            SendMessageError::Validation(_) => ApiError::Unprocessable(e.to_string()),
            SendMessageError::NotFound(_) => ApiError::NotFound(e.to_string()),
            SendMessageError::StoreUnavailable(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<FetchHistoryError> for ApiError {
    fn from(e: FetchHistoryError) -> Self {
        match e {
            FetchHistoryError::InvalidCursor(_) => ApiError::BadRequest(e.to_string()),
            FetchHistoryError::NotFound(_) => ApiError::NotFound(e.to_string()),
            FetchHistoryError::StoreUnavailable(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<MarkReadError> for ApiError {
    fn from(e: MarkReadError) -> Self {
        match e {
            MarkReadError::NotFound(_) => ApiError::NotFound(e.to_string()),
            MarkReadError::StoreUnavailable(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ListChatsError> for ApiError {
    fn from(e: ListChatsError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

fn parse_chat_id(raw: &str) -> Result<ChatId, ApiError> {
    raw.parse::<ChatId>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
        connections: state.message_pusher.count_connections().await,
        rooms: state.membership.count_rooms().await,
    })
}

/// Chat list of the caller, most recent activity first
pub async fn get_chats(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Query(query): Query<ChatListQuery>,
) -> Result<Json<ChatListDto>, ApiError> {
    let page = state
        .list_chats_usecase
        .execute(user_id, query.page.unwrap_or(0))
        .await?;
    Ok(Json(page.into()))
}

/// One page of history, newest first
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(chat_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<MessagePageDto>, ApiError> {
    let chat_id = parse_chat_id(&chat_id)?;
    let page = state
        .fetch_history_usecase
        .execute(user_id, chat_id, query.cursor.as_deref())
        .await?;
    Ok(Json(page.into()))
}

/// Persist a message and broadcast it to the room
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(chat_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let chat_id = parse_chat_id(&chat_id)?;
    let message = state
        .send_message_usecase
        .execute(chat_id, user_id, request.content)
        .await?;
    tracing::debug!(
        "User {} sent message {} to chat {}",
        user_id,
        message.id.value(),
        chat_id
    );
    Ok((StatusCode::CREATED, Json((&message).into())))
}

/// Mark a chat as read by the caller
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(chat_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let chat_id = parse_chat_id(&chat_id)?;
    state.mark_read_usecase.execute(chat_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! WebSocket connection handlers.
//!
//! Inbound frames are `chat:join` / `chat:leave`; outbound frames are
//! `message:new` pushed by the broadcaster. A frame that cannot be parsed or
//! names a malformed room is logged and ignored, never fatal.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{ChatId, Connection, UserId},
    infrastructure::dto::websocket::{ClientEvent, RoomRequest},
    ui::state::AppState,
};

use super::auth::bearer_token;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// Authenticate before the upgrade so that a bad session gets a plain 401.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let token = query
        .token
        .as_deref()
        .or_else(|| bearer_token(&headers));

    let user_id = match state.connect_connection_usecase.authenticate(token).await {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::warn!("Rejecting WebSocket upgrade: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

/// Spawns the single writer task of a connection.
///
/// Frames queued by the broadcaster are written in FIFO order.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: UserId) {
    let (tx, rx) = mpsc::unbounded_channel();
    let connection = state
        .connect_connection_usecase
        .register(user_id, tx)
        .await;
    tracing::info!(
        "Connection '{}' established for user {}",
        connection.id,
        user_id
    );

    let (sender, mut receiver) = socket.split();
    let state_clone = state.clone();

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on '{}': {}", connection.id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    handle_client_frame(&state_clone, &connection, text.as_str()).await;
                }
                Message::Close(_) => {
                    tracing::debug!("Connection '{}' requested close", connection.id);
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                _ => {}
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    let left = state
        .disconnect_connection_usecase
        .execute(&connection)
        .await;
    tracing::info!(
        "Connection '{}' closed, left {} room(s)",
        connection.id,
        left.len()
    );
}

async fn handle_client_frame(state: &AppState, connection: &Connection, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(
                "Ignoring unparseable frame from '{}': {}",
                connection.id,
                e
            );
            return;
        }
    };

    match event {
        ClientEvent::Join(request) => {
            let Some(chat_id) = room_of(connection, &request) else {
                return;
            };
            match state.join_room_usecase.execute(connection, chat_id).await {
                Ok(outcome) => {
                    tracing::debug!(
                        "Connection '{}' join chat {}: {:?}",
                        connection.id,
                        chat_id,
                        outcome
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Ignoring chat:join from '{}' for chat {}: {}",
                        connection.id,
                        chat_id,
                        e
                    );
                }
            }
        }
        ClientEvent::Leave(request) => {
            let Some(chat_id) = room_of(connection, &request) else {
                return;
            };
            let left = state.leave_room_usecase.execute(connection, chat_id).await;
            tracing::debug!(
                "Connection '{}' leave chat {}: {}",
                connection.id,
                chat_id,
                if left { "left" } else { "was not joined" }
            );
        }
    }
}

fn room_of(connection: &Connection, request: &RoomRequest) -> Option<ChatId> {
    let chat_id = request.chat_id();
    if chat_id.is_none() {
        tracing::warn!(
            "Ignoring malformed room id {} from '{}'",
            request.chat_id,
            connection.id
        );
    }
    chat_id
}

//! Live channel over WebSocket.
//!
//! One task owns the connection for the whole client lifetime. It forwards
//! `message:new` frames to the session, writes `chat:join` / `chat:leave`
//! frames queued by the session, and reconnects with a bounded number of
//! attempts when the link drops.

use futures_util::{SinkExt, StreamExt};
use hiroba_server::infrastructure::dto::websocket::{ClientEvent, RoomRequest, ServerEvent};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message},
};

use crate::{
    domain::{
        ChatMessage, ReconnectPolicy,
        reconnect::{should_attempt_reconnect, should_exit_immediately},
    },
    error::ClientError,
    session::SessionEvent,
};

/// Room membership commands written to the live channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomCommand {
    Join(i64),
    Leave(i64),
}

impl RoomCommand {
    fn to_frame(self) -> Result<String, ClientError> {
        let event = match self {
            RoomCommand::Join(chat_id) => ClientEvent::Join(RoomRequest {
                chat_id: chat_id.into(),
            }),
            RoomCommand::Leave(chat_id) => ClientEvent::Leave(RoomRequest {
                chat_id: chat_id.into(),
            }),
        };
        serde_json::to_string(&event).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Events produced by the live channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// `reconnect` is `true` for every connection after the first one
    Connected { reconnect: bool },
    Message(ChatMessage),
    Disconnected(String),
}

/// Join / leave rooms on the live channel
#[cfg_attr(test, mockall::automock)]
pub trait RoomSubscriber: Send + Sync {
    fn join(&self, chat_id: i64);
    fn leave(&self, chat_id: i64);
}

/// Queues room commands for the live channel task.
///
/// Commands queued while disconnected are written after the next connect.
#[derive(Clone)]
pub struct RoomCommandSender {
    tx: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomCommandSender {
    pub fn new(tx: mpsc::UnboundedSender<RoomCommand>) -> Self {
        Self { tx }
    }

    fn push(&self, command: RoomCommand) {
        if self.tx.send(command).is_err() {
            tracing::warn!("Live channel is gone; dropping {:?}", command);
        }
    }
}

impl RoomSubscriber for RoomCommandSender {
    fn join(&self, chat_id: i64) {
        self.push(RoomCommand::Join(chat_id));
    }

    fn leave(&self, chat_id: i64) {
        self.push(RoomCommand::Leave(chat_id));
    }
}

enum LinkError {
    /// Could not establish the connection
    Connect(ClientError),
    /// Established, then dropped
    Lost(ClientError),
}

/// Live channel URL with the bearer token as the `token` query parameter
fn live_url(base: &str, token: &str) -> Result<String, ClientError> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| ClientError::ConnectionError(format!("invalid url '{}': {}", base, e)))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.into())
}

/// Run the live channel with reconnection logic.
///
/// Returns `Ok(())` once the session side hangs up (command or event channel
/// closed), or the last error once reconnection is given up.
pub async fn run_live_channel(
    url: String,
    token: String,
    policy: ReconnectPolicy,
    mut commands: mpsc::UnboundedReceiver<RoomCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> Result<(), ClientError> {
    let connect_url = live_url(&url, &token)?;
    let mut failed_attempts = 0;
    let mut connected_before = false;

    loop {
        tracing::info!(
            "Attempting to connect to {} (attempt {}/{})",
            url,
            failed_attempts + 1,
            policy.max_attempts
        );

        let error = match run_connection(&connect_url, &mut commands, &events, connected_before).await {
            Ok(()) => {
                tracing::info!("Live channel closed");
                return Ok(());
            }
            Err(LinkError::Lost(e)) => {
                tracing::warn!("Connection lost: {}", e);
                connected_before = true;
                failed_attempts = 0;
                if events
                    .send(SessionEvent::Live(LiveEvent::Disconnected(e.to_string())))
                    .is_err()
                {
                    return Ok(());
                }
                e
            }
            Err(LinkError::Connect(e)) => e,
        };

        if should_exit_immediately(&error) {
            tracing::error!("{}", error);
            return Err(error);
        }

        failed_attempts += 1;
        if !should_attempt_reconnect(&error, failed_attempts, policy.max_attempts) {
            tracing::error!(
                "Failed to reconnect after {} attempts. Exiting.",
                policy.max_attempts
            );
            return Err(error);
        }

        tracing::info!(
            "Reconnecting in {:?}... (attempt {}/{})",
            policy.interval,
            failed_attempts + 1,
            policy.max_attempts
        );
        tokio::time::sleep(policy.interval).await;
    }
}

async fn run_connection(
    url: &str,
    commands: &mut mpsc::UnboundedReceiver<RoomCommand>,
    events: &mpsc::UnboundedSender<SessionEvent>,
    reconnect: bool,
) -> Result<(), LinkError> {
    let (ws_stream, _) = connect_async(url).await.map_err(|e| match e {
        tungstenite::Error::Http(response) if response.status().as_u16() == 401 => {
            LinkError::Connect(ClientError::Unauthorized(
                "session token rejected".to_string(),
            ))
        }
        other => LinkError::Connect(ClientError::ConnectionError(other.to_string())),
    })?;
    tracing::info!("Connected to chat server!");

    if events
        .send(SessionEvent::Live(LiveEvent::Connected { reconnect }))
        .is_err()
    {
        return Ok(());
    }

    let (mut write, mut read) = ws_stream.split();
    let lost = |reason: String| LinkError::Lost(ClientError::ConnectionError(reason));

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let Some(message) = decode_push(text.as_str()) else {
                        continue;
                    };
                    if events.send(SessionEvent::Live(LiveEvent::Message(message))).is_err() {
                        return Ok(());
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(lost("closed by server".to_string()));
                }
                Some(Err(e)) => return Err(lost(e.to_string())),
                Some(Ok(_)) => {}
            },
            command = commands.recv() => match command {
                Some(command) => {
                    let frame = match command.to_frame() {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::error!("Failed to serialize {:?}: {}", command, e);
                            continue;
                        }
                    };
                    tracing::debug!("Sending {:?}", command);
                    if let Err(e) = write.send(Message::text(frame)).await {
                        return Err(lost(e.to_string()));
                    }
                }
                None => {
                    let _ = write.close().await;
                    return Ok(());
                }
            },
        }
    }
}

fn decode_push(text: &str) -> Option<ChatMessage> {
    let event = match serde_json::from_str::<ServerEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Ignoring unknown frame: {}", e);
            return None;
        }
    };
    match event {
        ServerEvent::MessageNew(dto) => match ChatMessage::try_from(dto) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!("Ignoring malformed message:new: {}", e);
                None
            }
        },
    }
}

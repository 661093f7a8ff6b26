//! Server execution logic.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use thiserror::Error;
use tokio::{sync::oneshot, task::JoinHandle};
use tower_http::trace::TraceLayer;

use super::{
    handler::{
        get_chats, get_messages, health_check, mark_read, post_message, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server task failed: {0}")]
    Task(String),
}

/// Real-time chat server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(AppState::new(collaborators, JoinPolicy::MembersOnly));
/// server.run("127.0.0.1", 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Build the router with every endpoint
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/chats", get(get_chats))
            .route(
                "/api/chats/{chat_id}/messages",
                get(get_messages).post(post_message),
            )
            .route("/api/chats/{chat_id}/read", post(mark_read))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind and start serving in a background task.
    ///
    /// Port `0` binds an ephemeral port; see [`RunningServer::local_addr`].
    pub async fn start(&self, host: &str, port: u16) -> Result<RunningServer, ServerError> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = self.router();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::info!("Chat server listening on {}", local_addr);
        tracing::info!("Connect to: ws://{}/ws?token=<session token>", local_addr);

        Ok(RunningServer {
            local_addr,
            shutdown: Some(shutdown_tx),
            handle,
        })
    }

    /// Start, wait for Ctrl+C / SIGTERM, then stop.
    pub async fn run(self, host: &str, port: u16) -> Result<(), ServerError> {
        let running = self.start(host, port).await?;
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        shutdown_signal().await;
        running.stop().await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Handle to a started server
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for the serve task to finish.
    pub async fn stop(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.handle.await {
            Ok(result) => result.map_err(ServerError::from),
            Err(e) => Err(ServerError::Task(e.to_string())),
        }
    }
}

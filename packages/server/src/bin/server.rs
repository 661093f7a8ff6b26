//! Real-time chat server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server -- --demo
//! cargo run --bin hiroba-server -- --host 0.0.0.0 --port 3000 --join-policy open
//! ```

use std::sync::Arc;

use clap::Parser;
use hiroba_server::{
    config::{JoinPolicy, ServerConfig},
    domain::StoreError,
    infrastructure::repository::{InMemoryChatStore, InMemorySessionStore},
    ui::{AppState, Collaborators, Server},
};
use hiroba_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "Real-time chat delivery server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HIROBA_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "HIROBA_PORT", default_value = "8080")]
    port: u16,

    /// Who may join a chat room over the live channel
    #[arg(long, env = "HIROBA_JOIN_POLICY", value_enum, default_value_t = JoinPolicy::MembersOnly)]
    join_policy: JoinPolicy,

    /// Maximum message length in characters
    #[arg(long, env = "HIROBA_MAX_MESSAGE_LENGTH", default_value = "2000")]
    max_message_length: usize,

    /// Messages per history page and chats per chat list page
    #[arg(long, env = "HIROBA_PAGE_SIZE", default_value = "20")]
    page_size: usize,

    /// Seed demo users and chats, and print their session tokens
    #[arg(long, env = "HIROBA_DEMO")]
    demo: bool,
}

impl From<&Args> for ServerConfig {
    fn from(args: &Args) -> Self {
        Self {
            host: args.host.clone(),
            port: args.port,
            join_policy: args.join_policy,
            max_message_length: args.max_message_length,
            page_size: args.page_size,
        }
    }
}

/// Demo users: alice talks with bob and carol, bob and carol do not talk.
async fn seed_demo(
    store: &InMemoryChatStore,
    sessions: &InMemorySessionStore,
) -> Result<(), StoreError> {
    let mut users = Vec::new();
    for name in ["alice", "bob", "carol"] {
        let user = store.add_user(name, None).await?;
        let token = format!("demo-{}", name);
        sessions.insert(token.clone(), user.id).await;
        users.push((user, token));
    }

    let alice = users[0].0.id;
    for (counterpart, _) in &users[1..] {
        let chat_id = store.create_chat(alice, counterpart.id).await?;
        tracing::info!("Chat {} created: alice <-> {}", chat_id, counterpart.username);
    }

    for (user, token) in &users {
        tracing::info!("Demo user {} (id {}): token={}", user.username, user.id, token);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let config = ServerConfig::from(&args);
    tracing::info!("Starting with {:?}", config);

    // Initialize dependencies in order:
    // 1. Collaborators (clock, session store, chat store)
    // 2. AppState (use cases)
    // 3. Server

    // 1. Collaborators
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sessions = Arc::new(InMemorySessionStore::new());
    let store = Arc::new(InMemoryChatStore::new(
        clock.clone(),
        config.store_settings(),
    ));

    if args.demo {
        if let Err(e) = seed_demo(&store, &sessions).await {
            tracing::error!("Failed to seed demo data: {}", e);
            std::process::exit(1);
        }
    } else {
        tracing::warn!("No users registered; start with --demo to seed demo accounts");
    }

    // 2. AppState
    let state = AppState::new(
        Collaborators {
            sessions,
            store: store.clone(),
            directory: store,
            clock,
        },
        config.join_policy,
    );

    // 3. Server
    let server = Server::new(state);
    if let Err(e) = server.run(&config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

//! Interactive chat client with reconnection and history backfill.
//!
//! Connects the live channel (WebSocket) and the HTTP API of a Hiroba server
//! with a session token. The live channel reconnects automatically (max 5
//! attempts with 5 second interval); after a reconnect the open chat is
//! backfilled so messages sent while offline show up once, in order.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-client -- --token demo-alice --user-id 1
//! HIROBA_TOKEN=demo-bob HIROBA_USER_ID=2 cargo run --bin hiroba-client
//! ```

use clap::Parser;

use hiroba_client::cli::{CliConfig, run_cli};
use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-client")]
#[command(about = "Chat client with live delivery, history paging and unread counters", long_about = None)]
struct Args {
    /// WebSocket endpoint of the live channel
    #[arg(short = 'u', long, env = "HIROBA_WS_URL", default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Base URL of the HTTP API
    #[arg(short = 'a', long, env = "HIROBA_API_URL", default_value = "http://127.0.0.1:8080")]
    api_url: String,

    /// Session token
    #[arg(short = 't', long, env = "HIROBA_TOKEN")]
    token: String,

    /// Own user id (used to tell own messages apart and for unread counting)
    #[arg(short = 'i', long, env = "HIROBA_USER_ID")]
    user_id: i64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "warn");

    let args = Args::parse();
    let config = CliConfig {
        ws_url: args.url,
        api_url: args.api_url,
        token: args.token,
        user_id: args.user_id,
    };

    if let Err(e) = run_cli(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

//! Request handlers.

mod auth;
mod http;
mod websocket;

pub use http::{get_chats, get_messages, health_check, mark_read, post_message};
pub use websocket::websocket_handler;

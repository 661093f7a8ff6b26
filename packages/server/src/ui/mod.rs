//! UI 層（axum による HTTP / WebSocket の入口）

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::{RunningServer, Server, ServerError};
pub use state::{AppState, Collaborators};

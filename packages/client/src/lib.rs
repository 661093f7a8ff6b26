//! Chat client: keeps a live, paginated, multi-writer message list
//! consistent and tracks per-chat unread counters.

pub mod api;
pub mod domain;
pub mod error;
pub mod realtime;
pub mod session;

// CLI front-end
pub mod cli;
mod formatter;
mod ui;

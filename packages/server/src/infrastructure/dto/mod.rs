//! Data Transfer Objects (DTOs) for the chat delivery core.
//!
//! DTOs are organized by protocol:
//! - `websocket`: live channel events (`chat:join`, `chat:leave`, `message:new`)
//! - `http`: HTTP API request/response bodies

pub mod conversion;
pub mod http;
pub mod websocket;

//! Infrastructure 層
//!
//! - `dto`: ワイヤ表現（WebSocket イベント・HTTP レスポンス）
//! - `message_pusher`: `MessagePusher` の WebSocket 実装
//! - `repository`: 外部協調者のインメモリ実装

pub mod dto;
pub mod message_pusher;
pub mod repository;

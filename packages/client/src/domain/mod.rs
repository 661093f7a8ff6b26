//! Client-side domain logic.
//!
//! Everything here is a plain state object or a pure function; network I/O
//! lives in `api`, `realtime` and `session`.

pub mod chat_list;
pub mod chat_view;
pub mod message;
pub mod reconcile;
pub mod reconnect;

pub use chat_list::{ChatEntry, ChatList, LiveUpdate};
pub use chat_view::{
    AUTO_SCROLL_THRESHOLD_PX, ChatView, FetchKind, FetchTicket, PendingMessage, Phase,
    ScrollAnchor, ScrollEffect, SendTicket, Viewport,
};
pub use message::ChatMessage;
pub use reconcile::merge_messages;
pub use reconnect::ReconnectPolicy;

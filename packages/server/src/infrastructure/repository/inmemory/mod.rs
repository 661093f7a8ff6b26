//! インメモリ実装
//!
//! デモサーバーとテストで使用します。プロセス終了とともに内容は失われます。

mod chat_store;
mod membership;
mod session;

pub use chat_store::{ChatStoreSettings, InMemoryChatStore};
pub use membership::InMemoryMembershipRepository;
pub use session::InMemorySessionStore;

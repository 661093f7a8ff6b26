//! 外部協調者の実装

pub mod inmemory;

pub use inmemory::{
    ChatStoreSettings, InMemoryChatStore, InMemoryMembershipRepository, InMemorySessionStore,
};

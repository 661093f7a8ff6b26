//! ルームメンバーシップのドメインモデル
//!
//! `ChatId → 接続集合` と `接続 → ChatId 集合` の双方向インデックスを保持します。
//! メンバーが 0 になったルームはエントリごと削除されるため、
//! 「空のルームは存在しない」という不変条件が常に成り立ちます。
//!
//! 外部からは `join` / `leave` / `leave_all` / `members` を通してのみ操作し、
//! 内部のマップを直接走査・変更させません。

use std::collections::{HashMap, HashSet};

use super::value_object::{ChatId, ConnectionId};

#[derive(Debug, Default)]
pub struct RoomMembership {
    rooms: HashMap<ChatId, HashSet<ConnectionId>>,
    joined: HashMap<ConnectionId, HashSet<ChatId>>,
}

impl RoomMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接続をルームに参加させる
    ///
    /// 冪等。新規に参加した場合のみ `true` を返す。
    pub fn join(&mut self, connection_id: ConnectionId, chat_id: ChatId) -> bool {
        let inserted = self
            .rooms
            .entry(chat_id)
            .or_default()
            .insert(connection_id);
        self.joined
            .entry(connection_id)
            .or_default()
            .insert(chat_id);
        inserted
    }

    /// 接続をルームから外す
    ///
    /// 冪等。実際に外れた場合のみ `true` を返す。
    pub fn leave(&mut self, connection_id: ConnectionId, chat_id: ChatId) -> bool {
        let removed = match self.rooms.get_mut(&chat_id) {
            Some(members) => {
                let removed = members.remove(&connection_id);
                if members.is_empty() {
                    self.rooms.remove(&chat_id);
                }
                removed
            }
            None => false,
        };

        if let Some(chats) = self.joined.get_mut(&connection_id) {
            chats.remove(&chat_id);
            if chats.is_empty() {
                self.joined.remove(&connection_id);
            }
        }

        removed
    }

    /// 接続が参加している全ルームから外す（切断時）
    ///
    /// 外れたルームの ID を昇順で返す。
    pub fn leave_all(&mut self, connection_id: ConnectionId) -> Vec<ChatId> {
        let Some(chats) = self.joined.remove(&connection_id) else {
            return Vec::new();
        };

        let mut left: Vec<ChatId> = chats.into_iter().collect();
        left.sort();
        for chat_id in &left {
            if let Some(members) = self.rooms.get_mut(chat_id) {
                members.remove(&connection_id);
                if members.is_empty() {
                    self.rooms.remove(chat_id);
                }
            }
        }
        left
    }

    /// ルームに参加中の接続一覧
    pub fn members(&self, chat_id: ChatId) -> Vec<ConnectionId> {
        self.rooms
            .get(&chat_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// 接続が参加中のルーム一覧（昇順）
    pub fn rooms_of(&self, connection_id: ConnectionId) -> Vec<ChatId> {
        let mut chats: Vec<ChatId> = self
            .joined
            .get(&connection_id)
            .map(|chats| chats.iter().copied().collect())
            .unwrap_or_default();
        chats.sort();
        chats
    }

    pub fn is_member(&self, connection_id: ConnectionId, chat_id: ChatId) -> bool {
        self.rooms
            .get(&chat_id)
            .is_some_and(|members| members.contains(&connection_id))
    }

    /// 1 つ以上の接続を持つルーム数
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

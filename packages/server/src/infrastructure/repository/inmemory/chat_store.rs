//! InMemory Chat Store 実装
//!
//! `MessageStore` と `ChatDirectory` の両方を 1 つのストアで実装します。
//! メッセージ ID はストア全体で単調増加し、作成時刻はチャット内で
//! 単調非減少になるよう補正されます（時計が巻き戻っても `(created_at, id)` 順と
//! 採番順が一致する）。

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use hiroba_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    ChatDirectory, ChatId, ChatListPage, ChatSummary, Cursor, Message, MessageContent,
    MessageId, MessagePage, MessageStore, StoreError, Timestamp, UserId, UserSummary,
};

/// ストアの設定値
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatStoreSettings {
    /// 本文の最大文字数
    pub max_message_length: usize,
    /// 履歴・チャット一覧の 1 ページあたりの件数
    pub page_size: usize,
}

impl Default for ChatStoreSettings {
    fn default() -> Self {
        Self {
            max_message_length: 2000,
            page_size: 20,
        }
    }
}

struct ChatRecord {
    id: ChatId,
    members: [UserId; 2],
    created_at: Timestamp,
    /// 採番順（= 昇順）
    messages: Vec<Message>,
    last_read: HashMap<UserId, MessageId>,
}

impl ChatRecord {
    fn has_member(&self, user_id: UserId) -> bool {
        self.members.contains(&user_id)
    }

    fn counterpart_of(&self, user_id: UserId) -> UserId {
        if self.members[0] == user_id {
            self.members[1]
        } else {
            self.members[0]
        }
    }

    fn last_activity(&self) -> Timestamp {
        self.messages
            .last()
            .map(|m| m.created_at)
            .unwrap_or(self.created_at)
    }

    fn unread_for(&self, user_id: UserId) -> u32 {
        let last_read = self.last_read.get(&user_id).copied();
        let count = self
            .messages
            .iter()
            .filter(|m| m.sender.id != user_id)
            .filter(|m| last_read.is_none_or(|read| m.id > read))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

#[derive(Default)]
struct StoreData {
    users: HashMap<UserId, UserSummary>,
    chats: BTreeMap<ChatId, ChatRecord>,
    next_user_id: i64,
    next_chat_id: i64,
    next_message_id: i64,
}

impl StoreData {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

pub struct InMemoryChatStore {
    data: Mutex<StoreData>,
    clock: Arc<dyn Clock>,
    settings: ChatStoreSettings,
}

impl InMemoryChatStore {
    pub fn new(clock: Arc<dyn Clock>, settings: ChatStoreSettings) -> Self {
        Self {
            data: Mutex::new(StoreData::default()),
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> ChatStoreSettings {
        self.settings
    }

    /// ユーザーを登録する
    pub async fn add_user(
        &self,
        username: &str,
        avatar_url: Option<&str>,
    ) -> Result<UserSummary, StoreError> {
        let mut data = self.data.lock().await;
        let raw_id = StoreData::next_id(&mut data.next_user_id);
        let user = UserSummary {
            id: UserId::new(raw_id).map_err(|e| StoreError::Unavailable(e.to_string()))?,
            username: username.to_string(),
            avatar_url: avatar_url.map(str::to_string),
        };
        data.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// 2 人のユーザー間のチャットを作成する
    pub async fn create_chat(&self, a: UserId, b: UserId) -> Result<ChatId, StoreError> {
        if a == b {
            return Err(StoreError::Validation(
                "a chat needs two distinct members".to_string(),
            ));
        }
        let mut data = self.data.lock().await;
        for user in [a, b] {
            if !data.users.contains_key(&user) {
                return Err(StoreError::NotFound(format!("user {}", user)));
            }
        }
        let raw_id = StoreData::next_id(&mut data.next_chat_id);
        let chat_id = ChatId::new(raw_id).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        data.chats.insert(
            chat_id,
            ChatRecord {
                id: chat_id,
                members: [a, b],
                created_at: Timestamp::new(self.clock.now_millis()),
                messages: Vec::new(),
                last_read: HashMap::new(),
            },
        );
        Ok(chat_id)
    }
}

#[async_trait]
impl MessageStore for InMemoryChatStore {
    async fn create_message(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        content: MessageContent,
    ) -> Result<Message, StoreError> {
        if content.char_count() > self.settings.max_message_length {
            return Err(StoreError::Validation(format!(
                "message exceeds {} characters",
                self.settings.max_message_length
            )));
        }

        let mut data = self.data.lock().await;
        let sender = data
            .users
            .get(&sender_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {}", sender_id)))?;
        let is_member = data
            .chats
            .get(&chat_id)
            .is_some_and(|chat| chat.has_member(sender_id));
        if !is_member {
            return Err(StoreError::NotFound(format!("chat {}", chat_id)));
        }

        let raw_id = StoreData::next_id(&mut data.next_message_id);
        let chat = data
            .chats
            .get_mut(&chat_id)
            .ok_or_else(|| StoreError::NotFound(format!("chat {}", chat_id)))?;
        let now = self.clock.now_millis();
        let created_at = chat
            .messages
            .last()
            .map(|last| last.created_at.value().max(now))
            .unwrap_or(now);

        let message = Message {
            id: MessageId::new(raw_id).map_err(|e| StoreError::Unavailable(e.to_string()))?,
            chat_id,
            sender,
            content,
            created_at: Timestamp::new(created_at),
        };
        chat.messages.push(message.clone());
        // 自分の送信は既読扱い
        chat.last_read.insert(sender_id, message.id);

        Ok(message)
    }

    async fn list_messages(
        &self,
        chat_id: ChatId,
        cursor: Option<Cursor>,
    ) -> Result<MessagePage, StoreError> {
        let data = self.data.lock().await;
        let chat = data
            .chats
            .get(&chat_id)
            .ok_or_else(|| StoreError::NotFound(format!("chat {}", chat_id)))?;

        let older: Vec<&Message> = chat
            .messages
            .iter()
            .filter(|m| cursor.is_none_or(|c| m.id < c.before()))
            .collect();

        let page_size = self.settings.page_size.max(1);
        let start = older.len().saturating_sub(page_size);
        let page = &older[start..];

        let next_cursor = if start > 0 {
            page.first().map(|oldest| Cursor::new(oldest.id))
        } else {
            None
        };

        Ok(MessagePage {
            messages: page.iter().rev().map(|m| (*m).clone()).collect(),
            next_cursor,
        })
    }

    async fn mark_read(&self, chat_id: ChatId, user_id: UserId) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        let chat = data
            .chats
            .get_mut(&chat_id)
            .filter(|chat| chat.has_member(user_id))
            .ok_or_else(|| StoreError::NotFound(format!("chat {}", chat_id)))?;
        if let Some(last) = chat.messages.last() {
            chat.last_read.insert(user_id, last.id);
        }
        Ok(())
    }
}

#[async_trait]
impl ChatDirectory for InMemoryChatStore {
    async fn list_chats(
        &self,
        user_id: UserId,
        page_offset: usize,
    ) -> Result<ChatListPage, StoreError> {
        let data = self.data.lock().await;

        let mut chats: Vec<&ChatRecord> = data
            .chats
            .values()
            .filter(|chat| chat.has_member(user_id))
            .collect();
        chats.sort_by(|a, b| {
            b.last_activity()
                .cmp(&a.last_activity())
                .then(b.id.cmp(&a.id))
        });

        let total = chats.len();
        let page_size = self.settings.page_size.max(1);
        let summaries = chats
            .into_iter()
            .skip(page_offset.saturating_mul(page_size))
            .take(page_size)
            .map(|chat| {
                let counterpart_id = chat.counterpart_of(user_id);
                let counterpart = data
                    .users
                    .get(&counterpart_id)
                    .cloned()
                    .ok_or_else(|| StoreError::NotFound(format!("user {}", counterpart_id)))?;
                Ok(ChatSummary {
                    id: chat.id,
                    counterpart,
                    created_at: chat.created_at,
                    last_message: chat.messages.last().cloned(),
                    unread: chat.unread_for(user_id),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(ChatListPage {
            chats: summaries,
            total,
        })
    }

    async fn is_member(&self, chat_id: ChatId, user_id: UserId) -> Result<bool, StoreError> {
        let data = self.data.lock().await;
        Ok(data
            .chats
            .get(&chat_id)
            .is_some_and(|chat| chat.has_member(user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hiroba_shared::time::FixedClock;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - メッセージの作成（採番・検証・メンバー判定）
    // - カーソルによる履歴ページング（新しい順・境界）
    // - 既読化と未読数、チャット一覧の並び順
    //
    // 【なぜこのテストが必要か】
    // - クライアントの履歴バックフィルはこのページングに依存する
    // - ページ境界でメッセージが欠落・重複しないことを保証する
    // ========================================

    struct Fixture {
        store: InMemoryChatStore,
        clock: Arc<FixedClock>,
        alice: UserId,
        bob: UserId,
        carol: UserId,
        chat: ChatId,
    }

    async fn fixture(page_size: usize) -> Fixture {
        let clock = Arc::new(FixedClock::new(1_000));
        let store = InMemoryChatStore::new(
            clock.clone(),
            ChatStoreSettings {
                max_message_length: 10,
                page_size,
            },
        );
        let alice = store.add_user("alice", None).await.unwrap().id;
        let bob = store
            .add_user("bob", Some("https://example.com/bob.png"))
            .await
            .unwrap()
            .id;
        let carol = store.add_user("carol", None).await.unwrap().id;
        let chat = store.create_chat(alice, bob).await.unwrap();
        Fixture {
            store,
            clock,
            alice,
            bob,
            carol,
            chat,
        }
    }

    fn content(text: &str) -> MessageContent {
        MessageContent::new(text.to_string()).unwrap()
    }

    async fn send_n(f: &Fixture, n: usize) -> Vec<Message> {
        let mut sent = Vec::new();
        for i in 0..n {
            f.clock.advance(10);
            sent.push(
                f.store
                    .create_message(f.chat, f.alice, content(&format!("m{}", i)))
                    .await
                    .unwrap(),
            );
        }
        sent
    }

    #[tokio::test]
    async fn test_create_message_assigns_increasing_ids() {
        // テスト項目: メッセージ ID と作成時刻が単調に増加する
        // given (前提条件):
        let f = fixture(20).await;

        // when (操作):
        let sent = send_n(&f, 3).await;

        // then (期待する結果):
        assert!(sent.windows(2).all(|w| w[0].id < w[1].id));
        assert!(sent.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        assert_eq!(sent[0].sender.username, "alice");
    }

    #[tokio::test]
    async fn test_created_at_never_goes_backwards() {
        // テスト項目: 時計が巻き戻っても作成時刻は前のメッセージより前にならない
        // given (前提条件):
        let f = fixture(20).await;
        f.clock.set(5_000);
        let first = f
            .store
            .create_message(f.chat, f.alice, content("a"))
            .await
            .unwrap();

        // when (操作):
        f.clock.set(4_000);
        let second = f
            .store
            .create_message(f.chat, f.bob, content("b"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(second.created_at, first.created_at);
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_create_message_validation_errors() {
        // テスト項目: 長すぎる本文・非メンバー・存在しないチャットはエラー
        // given (前提条件):
        let f = fixture(20).await;

        // when (操作):
        let too_long = f
            .store
            .create_message(f.chat, f.alice, content("12345678901"))
            .await;
        let outsider = f
            .store
            .create_message(f.chat, f.carol, content("hi"))
            .await;
        let missing = f
            .store
            .create_message(ChatId::new(99).unwrap(), f.alice, content("hi"))
            .await;

        // then (期待する結果):
        assert!(matches!(too_long, Err(StoreError::Validation(_))));
        assert!(matches!(outsider, Err(StoreError::NotFound(_))));
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_messages_pages_newest_first_without_gaps() {
        // テスト項目: カーソルを辿ると全メッセージが欠落・重複なく取得できる
        // given (前提条件):
        let f = fixture(2).await;
        let sent = send_n(&f, 5).await;

        // when (操作):
        let first = f.store.list_messages(f.chat, None).await.unwrap();
        let second = f
            .store
            .list_messages(f.chat, first.next_cursor)
            .await
            .unwrap();
        let third = f
            .store
            .list_messages(f.chat, second.next_cursor)
            .await
            .unwrap();

        // then (期待する結果):
        let ids = |page: &MessagePage| page.messages.iter().map(|m| m.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), vec![sent[4].id, sent[3].id]);
        assert_eq!(ids(&second), vec![sent[2].id, sent[1].id]);
        assert_eq!(ids(&third), vec![sent[0].id]);
        assert!(first.next_cursor.is_some());
        assert!(second.next_cursor.is_some());
        assert_eq!(third.next_cursor, None);
    }

    #[tokio::test]
    async fn test_list_messages_exact_page_has_no_cursor() {
        // テスト項目: 残りがちょうど 1 ページ分なら次のカーソルは None
        // given (前提条件):
        let f = fixture(3).await;
        send_n(&f, 3).await;

        // when (操作):
        let page = f.store.list_messages(f.chat, None).await.unwrap();

        // then (期待する結果):
        assert_eq!(page.messages.len(), 3);
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn test_mark_read_resets_unread_in_chat_list() {
        // テスト項目: 相手のメッセージは未読に数えられ、既読化で 0 になる
        // given (前提条件):
        let f = fixture(20).await;
        send_n(&f, 3).await;

        // when (操作):
        let before = f.store.list_chats(f.bob, 0).await.unwrap();
        f.store.mark_read(f.chat, f.bob).await.unwrap();
        f.store.mark_read(f.chat, f.bob).await.unwrap();
        let after = f.store.list_chats(f.bob, 0).await.unwrap();

        // then (期待する結果):
        assert_eq!(before.chats[0].unread, 3);
        assert_eq!(after.chats[0].unread, 0);
        assert_eq!(before.chats[0].counterpart.username, "alice");
        // 送信者自身の未読は 0
        let sender_view = f.store.list_chats(f.alice, 0).await.unwrap();
        assert_eq!(sender_view.chats[0].unread, 0);
    }

    #[tokio::test]
    async fn test_list_chats_orders_by_last_activity() {
        // テスト項目: 最近メッセージがあったチャットが先頭に来る
        // given (前提条件):
        let f = fixture(20).await;
        f.clock.advance(10);
        let second_chat = f.store.create_chat(f.alice, f.carol).await.unwrap();
        f.clock.advance(10);
        f.store
            .create_message(f.chat, f.bob, content("ping"))
            .await
            .unwrap();

        // when (操作):
        let page = f.store.list_chats(f.alice, 0).await.unwrap();

        // then (期待する結果):
        assert_eq!(page.total, 2);
        assert_eq!(page.chats[0].id, f.chat);
        assert_eq!(page.chats[1].id, second_chat);
        assert_eq!(
            page.chats[0]
                .last_message
                .as_ref()
                .map(|m| m.content.as_str()),
            Some("ping")
        );
    }

    #[tokio::test]
    async fn test_is_member() {
        // テスト項目: メンバー判定
        // given (前提条件):
        let f = fixture(20).await;

        // then (期待する結果):
        assert_eq!(f.store.is_member(f.chat, f.alice).await, Ok(true));
        assert_eq!(f.store.is_member(f.chat, f.carol).await, Ok(false));
        assert_eq!(
            f.store.is_member(ChatId::new(42).unwrap(), f.alice).await,
            Ok(false)
        );
    }
}

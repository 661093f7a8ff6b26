//! Chat list and unread tracking
//!
//! 未読数の不変条件:
//! - アクティブなチャットの未読数は常に 0
//! - 非アクティブなチャットは、自分以外が送信したライブ配信 1 件ごとに +1
//! - 取り直した一覧は、ローカルで反映済みのメッセージより古ければ未読を上書きしない

use hiroba_server::infrastructure::dto::http::ChatSummaryDto;
use hiroba_shared::time::rfc3339_to_timestamp;

use crate::{domain::ChatMessage, error::ClientError};

/// チャット一覧の 1 エントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub id: i64,
    pub counterpart_id: i64,
    pub counterpart_username: String,
    /// 最新メッセージの本文
    pub preview: Option<String>,
    /// 最終活動時刻（最新メッセージ、無ければチャット作成時刻）
    pub last_activity: i64,
    /// 反映済みの最新メッセージ ID
    pub last_message_id: Option<i64>,
    pub unread: u32,
}

impl TryFrom<ChatSummaryDto> for ChatEntry {
    type Error = ClientError;

    fn try_from(dto: ChatSummaryDto) -> Result<Self, Self::Error> {
        let timestamp = |value: &str| {
            rfc3339_to_timestamp(value).ok_or_else(|| {
                ClientError::Decode(format!("chat {} has invalid timestamp '{}'", dto.id, value))
            })
        };
        let last_activity = match &dto.last_message {
            Some(message) => timestamp(&message.created_at)?,
            None => timestamp(&dto.created_at)?,
        };
        Ok(Self {
            id: dto.id,
            counterpart_id: dto.counterpart.id,
            counterpart_username: dto.counterpart.username.clone(),
            preview: dto.last_message.as_ref().map(|m| m.content.clone()),
            last_activity,
            last_message_id: dto.last_message.as_ref().map(|m| m.id),
            unread: dto.unread,
        })
    }
}

/// ライブ配信を反映した結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveUpdate {
    Applied,
    /// 一覧に無いチャット宛て。一覧全体を取り直す必要がある
    RefetchRequired,
}

pub struct ChatList {
    local_user_id: i64,
    /// 最近の活動順
    entries: Vec<ChatEntry>,
    active: Option<i64>,
}

impl ChatList {
    pub fn new(local_user_id: i64) -> Self {
        Self {
            local_user_id,
            entries: Vec::new(),
            active: None,
        }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn active(&self) -> Option<i64> {
        self.active
    }

    pub fn get(&self, chat_id: i64) -> Option<&ChatEntry> {
        self.entries.iter().find(|e| e.id == chat_id)
    }

    pub fn unread(&self, chat_id: i64) -> Option<u32> {
        self.get(chat_id).map(|e| e.unread)
    }

    pub fn total_unread(&self) -> u32 {
        self.entries.iter().map(|e| e.unread).sum()
    }

    pub fn chat_ids(&self) -> Vec<i64> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// 取り直した一覧で置き換える（アクティブなチャットの未読は 0 のまま）
    ///
    /// 取得中に届いたライブ配信の方が新しいエントリは、ローカルの
    /// プレビュー・最終活動時刻・未読を残す。
    pub fn replace_all(&mut self, entries: Vec<ChatEntry>) {
        let mut entries: Vec<ChatEntry> = entries
            .into_iter()
            .map(|mut fresh| {
                if let Some(local) = self.get(fresh.id)
                    && local.last_message_id > fresh.last_message_id
                {
                    fresh.preview = local.preview.clone();
                    fresh.last_activity = local.last_activity;
                    fresh.last_message_id = local.last_message_id;
                    fresh.unread = local.unread;
                }
                fresh
            })
            .collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.last_activity));
        self.entries = entries;
        if let Some(active) = self.active {
            self.zero_unread(active);
        }
    }

    /// アクティブなチャットを切り替え、未読を即座に 0 にする
    ///
    /// 既読化の API 呼び出しは呼び出し側が結果を待たずに行う。
    pub fn activate(&mut self, chat_id: i64) {
        self.active = Some(chat_id);
        self.zero_unread(chat_id);
    }

    pub fn deactivate(&mut self) {
        self.active = None;
    }

    fn zero_unread(&mut self, chat_id: i64) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == chat_id) {
            entry.unread = 0;
        }
    }

    /// ライブ配信を反映する
    ///
    /// 対象のチャットを先頭に移動し、プレビューを更新する。
    /// 非アクティブで自分以外の送信なら未読を +1 する。
    /// 一覧に既に含まれているメッセージは数えない。
    pub fn apply_live(&mut self, message: &ChatMessage) -> LiveUpdate {
        let Some(index) = self.entries.iter().position(|e| e.id == message.chat_id) else {
            return LiveUpdate::RefetchRequired;
        };

        let mut entry = self.entries.remove(index);
        if entry.last_message_id.is_none_or(|id| id < message.id) {
            entry.preview = Some(message.content.clone());
            entry.last_activity = entry.last_activity.max(message.created_at);
            entry.last_message_id = Some(message.id);
            if self.active != Some(message.chat_id) && message.sender_user_id != self.local_user_id
            {
                entry.unread = entry.unread.saturating_add(1);
            }
        }
        self.entries.insert(0, entry);
        LiveUpdate::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ME: i64 = 1;

    fn entry(id: i64, unread: u32) -> ChatEntry {
        ChatEntry {
            id,
            counterpart_id: id + 100,
            counterpart_username: format!("user{}", id),
            preview: None,
            last_activity: 0,
            last_message_id: None,
            unread,
        }
    }

    fn message(id: i64, chat_id: i64, sender: i64, content: &str, created_at: i64) -> ChatMessage {
        ChatMessage {
            id,
            chat_id,
            sender_user_id: sender,
            sender_username: format!("user{}", sender),
            sender_avatar_url: None,
            content: content.to_string(),
            created_at,
        }
    }

    fn list(entries: Vec<ChatEntry>) -> ChatList {
        let mut list = ChatList::new(ME);
        list.replace_all(entries);
        list
    }

    #[test]
    fn test_live_pushes_increment_unread_of_inactive_chat() {
        // テスト項目: 非アクティブなチャットへの N 件の配信で未読が +N される
        // given (前提条件):
        let mut list = list(vec![entry(1, 0), entry(2, 2)]);
        list.activate(1);

        // when (操作):
        for i in 0..3 {
            list.apply_live(&message(10 + i, 2, 9, &format!("m{}", i), 100 + i));
        }

        // then (期待する結果):
        assert_eq!(list.unread(2), Some(5));
        assert_eq!(list.unread(1), Some(0));
        assert_eq!(list.get(2).unwrap().preview.as_deref(), Some("m2"));
    }

    #[test]
    fn test_switching_chat_zeroes_unread() {
        // テスト項目: チャットを切り替えると未読は即座に 0 になり、以後の配信でも増えない
        // given (前提条件):
        let mut list = list(vec![entry(1, 0), entry(2, 4)]);

        // when (操作):
        list.activate(2);
        list.apply_live(&message(10, 2, 9, "while open", 100));

        // then (期待する結果):
        assert_eq!(list.unread(2), Some(0));
        assert_eq!(list.total_unread(), 0);
    }

    #[test]
    fn test_own_messages_do_not_count_as_unread() {
        // テスト項目: 自分の送信は非アクティブなチャットでも未読にならないが、先頭には移動する
        // given (前提条件):
        let mut list = list(vec![entry(1, 0), entry(2, 0)]);
        list.activate(1);

        // when (操作):
        list.apply_live(&message(10, 2, ME, "from another tab", 100));

        // then (期待する結果):
        assert_eq!(list.unread(2), Some(0));
        assert_eq!(list.chat_ids(), vec![2, 1]);
    }

    #[test]
    fn test_live_push_moves_chat_to_top() {
        // テスト項目: 配信を受けたチャットが一覧の先頭に移動する
        // given (前提条件):
        let mut list = list(vec![entry(1, 0), entry(2, 0), entry(3, 0)]);

        // when (操作):
        let update = list.apply_live(&message(10, 3, 9, "bump", 100));

        // then (期待する結果):
        assert_eq!(update, LiveUpdate::Applied);
        assert_eq!(list.chat_ids(), vec![3, 1, 2]);
        assert_eq!(list.get(3).unwrap().last_activity, 100);
    }

    #[test]
    fn test_unknown_chat_requires_refetch() {
        // テスト項目: 一覧に無いチャット宛ての配信は一覧の取り直しを要求する
        // given (前提条件):
        let mut list = list(vec![entry(1, 0)]);

        // when (操作):
        let update = list.apply_live(&message(10, 42, 9, "new chat", 100));

        // then (期待する結果):
        assert_eq!(update, LiveUpdate::RefetchRequired);
        assert_eq!(list.chat_ids(), vec![1]);
    }

    #[test]
    fn test_refetch_keeps_active_chat_read() {
        // テスト項目: 取り直した一覧でもアクティブなチャットの未読は 0
        // given (前提条件):
        let mut list = list(vec![entry(1, 0)]);
        list.activate(1);

        // when (操作):
        list.replace_all(vec![entry(1, 3), entry(42, 1)]);

        // then (期待する結果):
        assert_eq!(list.unread(1), Some(0));
        assert_eq!(list.unread(42), Some(1));
    }

    #[test]
    fn test_stale_refetch_keeps_newer_live_unread() {
        // テスト項目: 配信より前の状態を返した一覧で、配信で増えた未読が消えない
        // given (前提条件):
        let mut list = list(vec![entry(7, 0), entry(8, 0)]);
        list.activate(7);
        list.apply_live(&message(20, 8, 9, "ping", 100));

        // when (操作):
        list.replace_all(vec![entry(7, 0), entry(8, 0)]);

        // then (期待する結果):
        assert_eq!(list.unread(8), Some(1));
        assert_eq!(list.get(8).unwrap().preview.as_deref(), Some("ping"));
        assert_eq!(list.chat_ids(), vec![8, 7]);
    }

    #[test]
    fn test_newer_refetch_replaces_local_counts() {
        // テスト項目: 配信済みのメッセージを含む一覧は未読を上書きし、同じメッセージの遅れた配信は数えない
        // given (前提条件):
        let mut list = list(vec![entry(8, 0)]);
        list.apply_live(&message(20, 8, 9, "ping", 100));
        let mut fresh = entry(8, 2);
        fresh.last_message_id = Some(21);
        fresh.last_activity = 110;

        // when (操作):
        list.replace_all(vec![fresh]);
        list.apply_live(&message(21, 8, 9, "pong", 110));

        // then (期待する結果):
        assert_eq!(list.unread(8), Some(2));
        assert_eq!(list.get(8).unwrap().last_message_id, Some(21));
    }

    #[test]
    fn test_entry_from_dto() {
        // テスト項目: サーバーのチャット概要から一覧エントリが作られる
        // given (前提条件):
        let dto: ChatSummaryDto = serde_json::from_value(serde_json::json!({
            "id": 3,
            "counterpart": {"id": 2, "username": "bob", "avatarUrl": null},
            "createdAt": "2023-01-01T00:00:00.000Z",
            "lastMessage": {
                "id": 10, "chatId": 3, "senderUserId": 2, "senderAvatarUrl": null,
                "senderUsername": "bob", "content": "yo",
                "createdAt": "2023-01-01T00:00:01.000Z"
            },
            "unread": 2
        }))
        .unwrap();

        // when (操作):
        let entry = ChatEntry::try_from(dto).unwrap();

        // then (期待する結果):
        assert_eq!(entry.counterpart_username, "bob");
        assert_eq!(entry.preview.as_deref(), Some("yo"));
        assert_eq!(entry.last_activity, 1672531201000);
        assert_eq!(entry.last_message_id, Some(10));
        assert_eq!(entry.unread, 2);
    }
}

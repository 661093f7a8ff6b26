//! Id-keyed merge of message sources.
//!
//! History pages, live pushes and send confirmations all pass through
//! [`merge_messages`]. The merge is idempotent under replays and does not
//! depend on arrival order, so duplicate or out-of-order delivery needs no
//! special handling anywhere else.

use std::collections::HashMap;

use super::message::ChatMessage;

/// Merge `incoming` into `existing`.
///
/// Builds an id → message map from `existing`, overlays `incoming` (a later
/// write for the same id wins) and returns the values sorted ascending by
/// `(createdAt, id)`.
pub fn merge_messages<I>(existing: &[ChatMessage], incoming: I) -> Vec<ChatMessage>
where
    I: IntoIterator<Item = ChatMessage>,
{
    let mut by_id: HashMap<i64, ChatMessage> = existing
        .iter()
        .map(|message| (message.id, message.clone()))
        .collect();
    for message in incoming {
        by_id.insert(message.id, message);
    }

    let mut merged: Vec<ChatMessage> = by_id.into_values().collect();
    merged.sort_by_key(ChatMessage::sort_key);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: i64, created_at: i64) -> ChatMessage {
        ChatMessage {
            id,
            chat_id: 1,
            sender_user_id: 1,
            sender_username: "alice".to_string(),
            sender_avatar_url: None,
            content: format!("m{}", id),
            created_at,
        }
    }

    fn ids(messages: &[ChatMessage]) -> Vec<i64> {
        messages.iter().map(|m| m.id).collect()
    }

    fn assert_ordered_and_unique(messages: &[ChatMessage]) {
        for pair in messages.windows(2) {
            assert!(
                pair[0].sort_key() < pair[1].sort_key(),
                "{:?} must come before {:?}",
                pair[0].sort_key(),
                pair[1].sort_key()
            );
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        // テスト項目: 同じページを 2 回マージしても 1 回と同じ結果になる
        // given (前提条件):
        let page = vec![msg(3, 30), msg(1, 10), msg(2, 20)];

        // when (操作):
        let once = merge_messages(&[], page.clone());
        let twice = merge_messages(&once, page);

        // then (期待する結果):
        assert_eq!(once, twice);
        assert_eq!(ids(&twice), vec![1, 2, 3]);
    }

    #[test]
    fn test_later_write_wins() {
        // テスト項目: 同じ ID のメッセージは後から来たもので上書きされる
        // given (前提条件):
        let existing = vec![msg(1, 10)];
        let mut edited = msg(1, 10);
        edited.content = "edited".to_string();

        // when (操作):
        let merged = merge_messages(&existing, [edited]);

        // then (期待する結果):
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].content, "edited");
    }

    #[test]
    fn test_equal_timestamps_are_ordered_by_id() {
        // テスト項目: 作成時刻が同じ場合は ID 昇順になる
        // when (操作):
        let merged = merge_messages(&[msg(9, 50)], [msg(4, 50), msg(7, 40)]);

        // then (期待する結果):
        assert_eq!(ids(&merged), vec![7, 4, 9]);
    }

    #[test]
    fn test_order_invariant_under_arbitrary_sequences() {
        // テスト項目: 任意の順序・重複で pull/push を適用しても、結果は昇順かつ ID 一意
        // given (前提条件):
        // 線形合同法で決定的な擬似乱数列を作る
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move |bound: u64| {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (seed >> 33) % bound
        };

        for _round in 0..200 {
            let mut list: Vec<ChatMessage> = Vec::new();
            let mut seen = std::collections::HashSet::new();

            // when (操作):
            for _op in 0..20 {
                let batch_len = next(6) as usize;
                let batch: Vec<ChatMessage> = (0..batch_len)
                    .map(|_| {
                        let id = next(40) as i64 + 1;
                        // 時刻は ID から決まる（同一 ID は同一内容）、一部は衝突させる
                        msg(id, (id / 3) * 100)
                    })
                    .collect();
                seen.extend(batch.iter().map(|m| m.id));
                list = merge_messages(&list, batch);
            }

            // then (期待する結果):
            assert_ordered_and_unique(&list);
            assert_eq!(list.len(), seen.len());
        }
    }
}

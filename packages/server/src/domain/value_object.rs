//! Value Object 定義
//!
//! ドメインで扱う識別子・値を不変条件つきの型として表現します。
//! 生の `i64` / `String` は境界（DTO 変換）でのみ扱い、ドメイン内部では
//! 必ずこれらの型を経由します。

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use super::error::ValueObjectError;

/// チャット ID（= ルーム ID）
///
/// 正の整数のみを許容します。ルームはこの ID をキーとした動的なブロードキャストグループです。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(i64);

impl ChatId {
    pub fn new(value: i64) -> Result<Self, ValueObjectError> {
        if value <= 0 {
            return Err(ValueObjectError::InvalidChatId(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for ChatId {
    type Error = ValueObjectError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for ChatId {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|_| ValueObjectError::InvalidChatId(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ユーザー ID（セッションから確定する）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(i64);

impl UserId {
    pub fn new(value: i64) -> Result<Self, ValueObjectError> {
        if value <= 0 {
            return Err(ValueObjectError::InvalidUserId(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// メッセージ ID（ストレージが単調増加で採番する）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(i64);

impl MessageId {
    pub fn new(value: i64) -> Result<Self, ValueObjectError> {
        if value <= 0 {
            return Err(ValueObjectError::InvalidMessageId(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// 接続 ID（サーバーが接続ごとに払い出す不透明な値）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// 新しい接続 ID を生成
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// メッセージ本文
///
/// 空文字列（空白のみを含む）は許容しません。
/// 最大長は設定値に依存するため、ストレージ側で検証します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyMessageContent);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 文字数（バイト数ではない）
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Unix タイムスタンプ（UTC, ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// 履歴ページングのカーソル
///
/// 既に取得済みの最も古いメッセージ ID を指します。
/// ワイヤ上では 10 進数文字列として扱い、クライアントにとっては不透明な値です。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(MessageId);

impl Cursor {
    pub fn new(oldest_fetched: MessageId) -> Self {
        Self(oldest_fetched)
    }

    /// このカーソルより古い（ID が小さい）メッセージのみが次ページに含まれる
    pub fn before(&self) -> MessageId {
        self.0
    }

    pub fn encode(&self) -> String {
        self.0.value().to_string()
    }
}

impl FromStr for Cursor {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|_| ValueObjectError::InvalidCursor(s.to_string()))?;
        let id = MessageId::new(value).map_err(|_| ValueObjectError::InvalidCursor(s.to_string()))?;
        Ok(Self(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_id_rejects_non_positive_values() {
        // テスト項目: 0 以下のチャット ID は不正として扱われる
        // when (操作):
        let zero = ChatId::new(0);
        let negative = ChatId::new(-7);

        // then (期待する結果):
        assert_eq!(zero, Err(ValueObjectError::InvalidChatId("0".to_string())));
        assert!(negative.is_err());
    }

    #[test]
    fn test_chat_id_from_str() {
        // テスト項目: 数値文字列からチャット ID を生成できる
        // when (操作):
        let parsed = " 7 ".parse::<ChatId>();
        let garbage = "seven".parse::<ChatId>();

        // then (期待する結果):
        assert_eq!(parsed.map(|id| id.value()), Ok(7));
        assert_eq!(
            garbage,
            Err(ValueObjectError::InvalidChatId("seven".to_string()))
        );
    }

    #[test]
    fn test_message_content_rejects_blank() {
        // テスト項目: 空白のみの本文は生成できない
        // when (操作):
        let empty = MessageContent::new("".to_string());
        let blank = MessageContent::new("   \n".to_string());
        let ok = MessageContent::new("hi".to_string());

        // then (期待する結果):
        assert_eq!(empty, Err(ValueObjectError::EmptyMessageContent));
        assert_eq!(blank, Err(ValueObjectError::EmptyMessageContent));
        assert_eq!(ok.unwrap().as_str(), "hi");
    }

    #[test]
    fn test_message_content_counts_chars_not_bytes() {
        // テスト項目: 文字数はマルチバイト文字を 1 文字として数える
        // given (前提条件):
        let content = MessageContent::new("こんにちは".to_string()).unwrap();

        // then (期待する結果):
        assert_eq!(content.char_count(), 5);
    }

    #[test]
    fn test_cursor_encode_and_parse() {
        // テスト項目: カーソルは 10 進数文字列として往復できる
        // given (前提条件):
        let cursor = Cursor::new(MessageId::new(42).unwrap());

        // when (操作):
        let encoded = cursor.encode();
        let decoded = encoded.parse::<Cursor>();

        // then (期待する結果):
        assert_eq!(encoded, "42");
        assert_eq!(decoded, Ok(cursor));
        assert!("0".parse::<Cursor>().is_err());
        assert!("abc".parse::<Cursor>().is_err());
    }

    #[test]
    fn test_connection_ids_are_unique() {
        // テスト項目: 接続 ID は生成ごとに異なる
        // when (操作):
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();

        // then (期待する結果):
        assert_ne!(a, b);
    }
}

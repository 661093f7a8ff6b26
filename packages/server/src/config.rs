//! Server configuration.

use clap::ValueEnum;

use crate::infrastructure::repository::ChatStoreSettings;

/// `chat:join` の認可ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum JoinPolicy {
    /// チャットのメンバーのみ参加できる
    #[default]
    MembersOnly,
    /// 参加時に検証しない
    Open,
}

/// Values resolved from the command line / environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub join_policy: JoinPolicy,
    pub max_message_length: usize,
    pub page_size: usize,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn store_settings(&self) -> ChatStoreSettings {
        ChatStoreSettings {
            max_message_length: self.max_message_length,
            page_size: self.page_size,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let store = ChatStoreSettings::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            join_policy: JoinPolicy::default(),
            max_message_length: store.max_message_length,
            page_size: store.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_policy_value_names() {
        // テスト項目: CLI で使う値名がケバブケースになる
        // when (操作):
        let members_only = JoinPolicy::from_str("members-only", false);
        let open = JoinPolicy::from_str("open", false);
        let unknown = JoinPolicy::from_str("everyone", false);

        // then (期待する結果):
        assert_eq!(members_only, Ok(JoinPolicy::MembersOnly));
        assert_eq!(open, Ok(JoinPolicy::Open));
        assert!(unknown.is_err());
    }

    #[test]
    fn test_default_config() {
        // テスト項目: 既定値はメンバー限定・本文 2000 文字・20 件ページ
        // when (操作):
        let config = ServerConfig::default();

        // then (期待する結果):
        assert_eq!(config.join_policy, JoinPolicy::MembersOnly);
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(
            config.store_settings(),
            ChatStoreSettings {
                max_message_length: 2000,
                page_size: 20,
            }
        );
    }
}

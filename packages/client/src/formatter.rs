//! Message formatting utilities for client display.

use hiroba_shared::time::timestamp_to_rfc3339;

use crate::domain::{ChatEntry, ChatMessage, PendingMessage};

const RULE: &str = "============================================================";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the chat list with unread counters
    ///
    /// # Arguments
    ///
    /// * `entries` - Chats in recent-activity order
    /// * `active` - The currently open chat, marked with `*`
    pub fn format_chat_list(entries: &[ChatEntry], active: Option<i64>) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\nChats:\n", RULE));

        if entries.is_empty() {
            output.push_str("(No chats)\n");
        } else {
            for entry in entries {
                let marker = if active == Some(entry.id) { "*" } else { " " };
                let unread = if entry.unread > 0 {
                    format!(" [{} unread]", entry.unread)
                } else {
                    String::new()
                };
                let preview = entry.preview.as_deref().unwrap_or("");
                output.push_str(&format!(
                    "{} #{} @{}{} {}\n",
                    marker, entry.id, entry.counterpart_username, unread, preview
                ));
            }
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// Format a confirmed message; own messages are marked "(me)"
    pub fn format_message(message: &ChatMessage, local_user_id: i64) -> String {
        let me_suffix = if message.sender_user_id == local_user_id {
            " (me)"
        } else {
            ""
        };
        format!(
            "[{}] @{}{}: {}\n",
            timestamp_to_rfc3339(message.created_at),
            message.sender_username,
            me_suffix,
            message.content
        )
    }

    /// Format a local echo that has not been confirmed yet
    pub fn format_pending(pending: &PendingMessage) -> String {
        if pending.failed {
            format!("! failed to send: {} (/discard to drop)\n", pending.content)
        } else {
            format!("… sending: {}\n", pending.content)
        }
    }

    /// Header printed before a full redraw of the open chat
    pub fn format_view_header(entry: Option<&ChatEntry>, chat_id: i64, has_more: bool) -> String {
        let title = match entry {
            Some(entry) => format!("#{} with @{}", chat_id, entry.counterpart_username),
            None => format!("#{}", chat_id),
        };
        let more = if has_more {
            "(/older for earlier messages)\n"
        } else {
            "(beginning of conversation)\n"
        };
        format!("\n{}\n{}\n{}", RULE, title, more)
    }

    pub fn format_unread_notice(entry: &ChatEntry) -> String {
        format!(
            "* #{} @{}: {} unread\n",
            entry.id, entry.counterpart_username, entry.unread
        )
    }
}

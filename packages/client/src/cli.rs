//! Interactive terminal front-end.
//!
//! Reads lines with rustyline on a blocking thread and drives a
//! [`ChatSession`] from a single task. Plain lines are sent to the open chat;
//! lines starting with `/` are commands.

use std::{collections::HashSet, sync::Arc};

use hiroba_shared::time::SystemClock;
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{
    api::HttpChatApi,
    domain::{ReconnectPolicy, ScrollEffect},
    error::ClientError,
    realtime::{RoomCommandSender, run_live_channel},
    session::{ChatSession, SessionUpdate},
};

use super::{formatter::MessageFormatter, ui::redisplay_prompt};

const PROMPT: &str = "> ";

const HELP: &str = "\
Commands:
  /chats         list chats with unread counters
  /open <id>     open a chat and load its latest messages
  /close         close the open chat
  /older         load the page before the oldest shown message
  /discard       drop the most recent failed message
  /quit          exit
Anything else is sent to the open chat.
";

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub ws_url: String,
    pub api_url: String,
    pub token: String,
    pub user_id: i64,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Chats,
    Open(i64),
    Close,
    Older,
    Discard,
    Quit,
    Help,
    Send(String),
    Invalid(String),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("chats"), None) => Command::Chats,
        (Some("open"), Some(id)) => match id.parse::<i64>() {
            Ok(id) if id > 0 => Command::Open(id),
            _ => Command::Invalid(format!("invalid chat id '{}'", id)),
        },
        (Some("close"), None) => Command::Close,
        (Some("older"), None) => Command::Older,
        (Some("discard"), None) => Command::Discard,
        (Some("quit"), None) => Command::Quit,
        (Some("help"), None) => Command::Help,
        _ => Command::Invalid(format!("unknown command '{}'", line)),
    }
}

/// Tracks which messages of the open chat are already on screen
struct Renderer {
    local_user_id: i64,
    shown: HashSet<i64>,
    last_shown: Option<(i64, i64)>,
    last_total_unread: u32,
}

impl Renderer {
    fn new(local_user_id: i64) -> Self {
        Self {
            local_user_id,
            shown: HashSet::new(),
            last_shown: None,
            last_total_unread: 0,
        }
    }

    fn reset(&mut self) {
        self.shown.clear();
        self.last_shown = None;
    }

    fn render(&mut self, session: &ChatSession, updates: Vec<SessionUpdate>) {
        let mut output = String::new();
        for update in updates {
            match update {
                SessionUpdate::ChatListChanged => output.push_str(&self.unread_notices(session)),
                SessionUpdate::ViewChanged(effect) => {
                    output.push_str(&self.view_changes(session, effect));
                }
                SessionUpdate::Connected { reconnect: false } => {
                    output.push_str("\nConnected. Type /help for commands.\n");
                }
                SessionUpdate::Connected { reconnect: true } => {
                    output.push_str("\nReconnected; catching up on missed messages.\n");
                }
                SessionUpdate::Disconnected(reason) => {
                    output.push_str(&format!("\nDisconnected ({}); reconnecting...\n", reason));
                }
                SessionUpdate::Error(e) => output.push_str(&format!("\nError: {}\n", e)),
            }
        }
        if !output.is_empty() {
            print!("{}", output);
            redisplay_prompt(PROMPT);
        }
    }

    fn unread_notices(&mut self, session: &ChatSession) -> String {
        let total = session.chats().total_unread();
        let increased = total > self.last_total_unread;
        self.last_total_unread = total;
        if !increased {
            return String::new();
        }

        let active = session.chats().active();
        let mut output = String::from("\n");
        for entry in session.chats().entries() {
            if Some(entry.id) != active && entry.unread > 0 {
                output.push_str(&MessageFormatter::format_unread_notice(entry));
            }
        }
        output
    }

    /// Print new messages. A page prepended above what is on screen causes a
    /// full redraw.
    fn view_changes(&mut self, session: &ChatSession, effect: ScrollEffect) -> String {
        let view = session.view();
        let Some(chat_id) = view.chat_id() else {
            return String::new();
        };

        let fresh: Vec<_> = view
            .messages()
            .iter()
            .filter(|m| !self.shown.contains(&m.id))
            .collect();
        let prepended = matches!(effect, ScrollEffect::PreserveAnchor(_))
            || fresh
                .iter()
                .any(|m| self.last_shown.is_some_and(|last| m.sort_key() < last));

        let mut output = String::new();
        let to_print = if prepended || self.shown.is_empty() {
            self.reset();
            output.push_str(&MessageFormatter::format_view_header(
                session.chats().get(chat_id),
                chat_id,
                view.has_more(),
            ));
            view.messages().iter().collect()
        } else {
            fresh
        };

        for message in to_print {
            output.push_str(&MessageFormatter::format_message(message, self.local_user_id));
            self.shown.insert(message.id);
            self.last_shown = Some(message.sort_key());
        }
        for pending in view.pending() {
            output.push_str(&MessageFormatter::format_pending(pending));
        }
        output
    }
}

/// Run the interactive client until `/quit`, end of input, or the live
/// channel gives up.
pub async fn run_cli(config: CliConfig) -> Result<(), ClientError> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();

    let api = Arc::new(HttpChatApi::new(config.api_url.clone(), config.token.clone()));
    let rooms = Arc::new(RoomCommandSender::new(commands_tx));
    let mut session = ChatSession::new(
        api,
        rooms,
        Arc::new(SystemClock),
        config.user_id,
        events_tx.clone(),
    );

    let mut live_task = tokio::spawn(run_live_channel(
        config.ws_url.clone(),
        config.token.clone(),
        ReconnectPolicy::default(),
        commands_rx,
        events_tx,
    ));

    // Create channel for rustyline input
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    let mut renderer = Renderer::new(config.user_id);
    session.refresh_chat_list();

    loop {
        tokio::select! {
            line = input_rx.recv() => {
                let Some(line) = line else { break };
                match parse_command(&line) {
                    Command::Quit => break,
                    Command::Help => print!("{}", HELP),
                    Command::Chats => print!(
                        "{}",
                        MessageFormatter::format_chat_list(
                            session.chats().entries(),
                            session.chats().active(),
                        )
                    ),
                    Command::Open(chat_id) => {
                        renderer.reset();
                        let updates = session.open_chat(chat_id);
                        renderer.render(&session, updates);
                    }
                    Command::Close => {
                        renderer.reset();
                        let updates = session.close_chat();
                        if updates.is_empty() {
                            println!("No chat is open.");
                        }
                        renderer.render(&session, updates);
                    }
                    Command::Older => {
                        if !session.load_older() {
                            println!("Nothing to load right now.");
                        }
                    }
                    Command::Discard => {
                        let failed = session
                            .view()
                            .pending()
                            .iter()
                            .rev()
                            .find(|p| p.failed)
                            .map(|p| p.local_id);
                        match failed {
                            Some(local_id) => {
                                session.discard_failed(local_id);
                                println!("Discarded.");
                            }
                            None => println!("No failed message to discard."),
                        }
                    }
                    Command::Send(content) => {
                        if session.send(&content).is_some() {
                            renderer.render(
                                &session,
                                vec![SessionUpdate::ViewChanged(ScrollEffect::SnapToBottom)],
                            );
                        } else {
                            println!("Open a chat first: /open <id>");
                        }
                    }
                    Command::Invalid(reason) => println!("{} (try /help)", reason),
                }
                redisplay_prompt(PROMPT);
            }
            Some(event) = events_rx.recv() => {
                let updates = session.handle(event);
                renderer.render(&session, updates);
            }
            result = &mut live_task => {
                return match result {
                    Ok(result) => result,
                    Err(e) => Err(ClientError::ConnectionError(e.to_string())),
                };
            }
        }
    }

    live_task.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_text_is_send() {
        // テスト項目: スラッシュで始まらない入力は送信として扱われる
        // when (操作):
        let command = parse_command("  hello there ");

        // then (期待する結果):
        assert_eq!(command, Command::Send("hello there".to_string()));
    }

    #[test]
    fn test_parse_commands() {
        // テスト項目: 各コマンドが解釈される
        // then (期待する結果):
        assert_eq!(parse_command("/chats"), Command::Chats);
        assert_eq!(parse_command("/open 12"), Command::Open(12));
        assert_eq!(parse_command("/close"), Command::Close);
        assert_eq!(parse_command("/older"), Command::Older);
        assert_eq!(parse_command("/discard"), Command::Discard);
        assert_eq!(parse_command("/quit"), Command::Quit);
        assert_eq!(parse_command("/help"), Command::Help);
    }

    #[test]
    fn test_parse_invalid_commands() {
        // テスト項目: 不正なチャット ID や未知のコマンドはエラーになる
        // then (期待する結果):
        assert!(matches!(parse_command("/open abc"), Command::Invalid(_)));
        assert!(matches!(parse_command("/open 0"), Command::Invalid(_)));
        assert!(matches!(parse_command("/open"), Command::Invalid(_)));
        assert!(matches!(parse_command("/dance"), Command::Invalid(_)));
        assert!(matches!(parse_command("/close 3"), Command::Invalid(_)));
    }
}

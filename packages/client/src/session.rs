//! Chat session: glues the chat list, the active chat view, the HTTP API and
//! the live channel together.
//!
//! The session is single-owner state driven from one task. Network calls are
//! spawned and report back through [`SessionEvent`]s on the session's own
//! channel, so every state transition happens inside [`ChatSession::handle`]
//! or one of the user-action methods.

use std::{collections::HashSet, sync::Arc};

use hiroba_server::infrastructure::dto::{
    http::{ChatListDto, MessagePageDto},
    websocket::MessageDto,
};
use hiroba_shared::time::Clock;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    api::ChatApi,
    domain::{
        ChatEntry, ChatList, ChatMessage, ChatView, FetchTicket, LiveUpdate, ScrollEffect,
        SendTicket, Viewport,
    },
    error::ClientError,
    realtime::{LiveEvent, RoomSubscriber},
};

/// Inputs of the session state machine
#[derive(Debug)]
pub enum SessionEvent {
    Live(LiveEvent),
    /// Tagged with the sequence number of the refetch that produced it
    ChatListLoaded(u64, Result<ChatListDto, ClientError>),
    HistoryLoaded(FetchTicket, Result<MessagePageDto, ClientError>),
    SendFinished(SendTicket, Result<MessageDto, ClientError>),
}

/// What the UI has to redraw after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    ChatListChanged,
    ViewChanged(ScrollEffect),
    Connected { reconnect: bool },
    Disconnected(String),
    Error(ClientError),
}

pub struct ChatSession {
    api: Arc<dyn ChatApi>,
    rooms: Arc<dyn RoomSubscriber>,
    clock: Arc<dyn Clock>,
    events: mpsc::UnboundedSender<SessionEvent>,
    chats: ChatList,
    view: ChatView,
    viewport: Option<Viewport>,
    /// Rooms joined on the current live connection
    joined: HashSet<i64>,
    /// Sequence number of the latest chat list refetch
    chat_list_requested: u64,
    /// Sequence number of the latest chat list response applied
    chat_list_applied: u64,
}

impl ChatSession {
    pub fn new(
        api: Arc<dyn ChatApi>,
        rooms: Arc<dyn RoomSubscriber>,
        clock: Arc<dyn Clock>,
        local_user_id: i64,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            api,
            rooms,
            clock,
            events,
            chats: ChatList::new(local_user_id),
            view: ChatView::new(local_user_id),
            viewport: None,
            joined: HashSet::new(),
            chat_list_requested: 0,
            chat_list_applied: 0,
        }
    }

    pub fn chats(&self) -> &ChatList {
        &self.chats
    }

    pub fn view(&self) -> &ChatView {
        &self.view
    }

    /// Latest scroll geometry reported by the UI. `None` means "at the bottom".
    pub fn set_viewport(&mut self, viewport: Option<Viewport>) {
        self.viewport = viewport;
    }

    // ========================================
    // User actions
    // ========================================

    /// Refetch the chat list. Responses to older refetches that arrive after
    /// a newer one has been applied are dropped.
    pub fn refresh_chat_list(&mut self) {
        self.chat_list_requested += 1;
        let seq = self.chat_list_requested;
        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = api.list_chats(0).await;
            let _ = events.send(SessionEvent::ChatListLoaded(seq, result));
        });
    }

    /// Make `chat_id` the active chat
    ///
    /// Unread is zeroed locally right away; the mark-read call is not awaited.
    pub fn open_chat(&mut self, chat_id: i64) -> Vec<SessionUpdate> {
        let previous = self.view.chat_id();
        self.chats.activate(chat_id);
        self.view.open(chat_id);
        self.spawn_mark_read(chat_id);
        if let Some(previous) = previous.filter(|id| *id != chat_id) {
            self.leave_if_unlisted(previous);
        }
        self.join(chat_id);

        if let Some(ticket) = self.view.begin_fetch(self.viewport) {
            self.spawn_fetch(ticket);
        }
        vec![
            SessionUpdate::ChatListChanged,
            SessionUpdate::ViewChanged(ScrollEffect::None),
        ]
    }

    /// Close the active chat. Its room is left unless the chat list still
    /// shows it.
    pub fn close_chat(&mut self) -> Vec<SessionUpdate> {
        let Some(chat_id) = self.view.chat_id() else {
            return Vec::new();
        };
        self.chats.deactivate();
        self.view.close();
        self.leave_if_unlisted(chat_id);
        vec![
            SessionUpdate::ChatListChanged,
            SessionUpdate::ViewChanged(ScrollEffect::None),
        ]
    }

    /// Request the page older than the cursor.
    ///
    /// Returns `false` when the request was dropped (a fetch is in flight or
    /// history is exhausted).
    pub fn load_older(&mut self) -> bool {
        match self.view.begin_fetch(self.viewport) {
            Some(ticket) => {
                self.spawn_fetch(ticket);
                true
            }
            None => false,
        }
    }

    /// Optimistic send to the active chat
    pub fn send(&mut self, content: &str) -> Option<Uuid> {
        let ticket = self.view.begin_send(content, self.clock.now_millis())?;
        let local_id = ticket.local_id();

        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = api
                .send_message(ticket.chat_id(), ticket.content().to_string())
                .await;
            let _ = events.send(SessionEvent::SendFinished(ticket, result));
        });
        Some(local_id)
    }

    pub fn discard_failed(&mut self, local_id: Uuid) -> bool {
        self.view.discard_failed(local_id)
    }

    // ========================================
    // Event handling
    // ========================================

    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionUpdate> {
        match event {
            SessionEvent::Live(LiveEvent::Message(message)) => self.on_live_message(message),
            SessionEvent::Live(LiveEvent::Connected { reconnect }) => self.on_connected(reconnect),
            SessionEvent::Live(LiveEvent::Disconnected(reason)) => {
                self.joined.clear();
                vec![SessionUpdate::Disconnected(reason)]
            }
            SessionEvent::ChatListLoaded(seq, result) => self.on_chat_list(seq, result),
            SessionEvent::HistoryLoaded(ticket, result) => self.on_history(ticket, result),
            SessionEvent::SendFinished(ticket, result) => self.on_send_finished(ticket, result),
        }
    }

    fn on_live_message(&mut self, message: ChatMessage) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        match self.chats.apply_live(&message) {
            LiveUpdate::Applied => updates.push(SessionUpdate::ChatListChanged),
            LiveUpdate::RefetchRequired => {
                tracing::debug!("Push for unknown chat {}; refetching list", message.chat_id);
                self.refresh_chat_list();
            }
        }

        if self.view.chat_id() == Some(message.chat_id) {
            let effect = self.view.apply_live(message, self.viewport);
            updates.push(SessionUpdate::ViewChanged(effect));
        }
        updates
    }

    /// Server-side membership does not survive a disconnect: re-join every
    /// known room, then backfill the active chat for pushes missed while
    /// offline.
    fn on_connected(&mut self, reconnect: bool) -> Vec<SessionUpdate> {
        self.joined.clear();
        let mut rooms = self.chats.chat_ids();
        rooms.extend(self.view.chat_id());
        for chat_id in rooms {
            self.join(chat_id);
        }

        if reconnect {
            self.refresh_chat_list();
            if let Some(ticket) = self.view.begin_backfill(self.viewport) {
                self.spawn_fetch(ticket);
            }
        }
        vec![SessionUpdate::Connected { reconnect }]
    }

    fn on_chat_list(
        &mut self,
        seq: u64,
        result: Result<ChatListDto, ClientError>,
    ) -> Vec<SessionUpdate> {
        if seq <= self.chat_list_applied {
            tracing::debug!(
                "Dropping chat list #{} (already applied #{})",
                seq,
                self.chat_list_applied
            );
            return Vec::new();
        }
        let dto = match result {
            Ok(dto) => dto,
            Err(e) => {
                tracing::warn!("Failed to load chat list: {}", e);
                return vec![SessionUpdate::Error(e)];
            }
        };

        let entries: Vec<ChatEntry> = dto
            .chats
            .into_iter()
            .filter_map(|chat| match ChatEntry::try_from(chat) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping chat: {}", e);
                    None
                }
            })
            .collect();
        self.chat_list_applied = seq;
        self.chats.replace_all(entries);
        for chat_id in self.chats.chat_ids() {
            self.join(chat_id);
        }
        let hidden: Vec<i64> = self
            .joined
            .iter()
            .copied()
            .filter(|id| self.view.chat_id() != Some(*id))
            .collect();
        for chat_id in hidden {
            self.leave_if_unlisted(chat_id);
        }
        vec![SessionUpdate::ChatListChanged]
    }

    fn on_history(
        &mut self,
        ticket: FetchTicket,
        result: Result<MessagePageDto, ClientError>,
    ) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        match result {
            Ok(page) => {
                let messages = page
                    .messages
                    .into_iter()
                    .filter_map(|dto| match ChatMessage::try_from(dto) {
                        Ok(message) => Some(message),
                        Err(e) => {
                            tracing::warn!("Skipping message: {}", e);
                            None
                        }
                    })
                    .collect();
                let effect = self.view.complete_fetch(&ticket, messages, page.next_cursor);
                updates.push(SessionUpdate::ViewChanged(effect));
            }
            Err(e) => {
                tracing::warn!("Failed to load history of chat {}: {}", ticket.chat_id(), e);
                self.view.fail_fetch(&ticket);
                updates.push(SessionUpdate::Error(e));
            }
        }

        if let Some(queued) = self.view.take_queued_backfill(self.viewport) {
            self.spawn_fetch(queued);
        }
        updates
    }

    fn on_send_finished(
        &mut self,
        ticket: SendTicket,
        result: Result<MessageDto, ClientError>,
    ) -> Vec<SessionUpdate> {
        match result.and_then(ChatMessage::try_from) {
            Ok(message) => {
                let effect = self.view.confirm_send(&ticket, message, self.viewport);
                vec![SessionUpdate::ViewChanged(effect)]
            }
            Err(e) => {
                tracing::warn!("Failed to send to chat {}: {}", ticket.chat_id(), e);
                self.view.fail_send(&ticket);
                vec![
                    SessionUpdate::ViewChanged(ScrollEffect::None),
                    SessionUpdate::Error(e),
                ]
            }
        }
    }

    // ========================================
    // Helpers
    // ========================================

    fn join(&mut self, chat_id: i64) {
        if self.joined.insert(chat_id) {
            self.rooms.join(chat_id);
        }
    }

    fn leave_if_unlisted(&mut self, chat_id: i64) {
        if self.chats.get(chat_id).is_none() && self.joined.remove(&chat_id) {
            self.rooms.leave(chat_id);
        }
    }

    fn spawn_fetch(&self, ticket: FetchTicket) {
        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        tokio::spawn(async move {
            let cursor = ticket.cursor().map(str::to_string);
            let result = api.list_messages(ticket.chat_id(), cursor).await;
            let _ = events.send(SessionEvent::HistoryLoaded(ticket, result));
        });
    }

    fn spawn_mark_read(&self, chat_id: i64) {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            if let Err(e) = api.mark_read(chat_id).await {
                tracing::warn!("Failed to mark chat {} as read: {}", chat_id, e);
            }
        });
    }
}

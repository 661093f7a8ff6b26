//! Chat view state machine
//!
//! アクティブなチャット 1 件分のメッセージ一覧を保持します。
//! 入力は 3 系統あります。
//!
//! - 履歴ページ（pull, カーソルで過去方向へ）
//! - ライブ配信（push, `message:new`）
//! - 楽観的送信（ローカルエコー → 確定メッセージ）
//!
//! いずれも [`merge_messages`] を通して一覧に反映されるため、
//! 一覧は常に `(createdAt, id)` 昇順で ID が一意です。
//!
//! 状態遷移はすべて同期的な純粋メソッドで、ネットワーク呼び出しは行いません。
//! 非同期処理の結果は発行時の [`FetchTicket`] / [`SendTicket`] とともに戻され、
//! アクティブなチャットが切り替わった後に届いた結果は破棄されます。
//!
//! スクロール制御は [`ScrollEffect`] として値で返し、実際の適用は UI 側で行います。

use uuid::Uuid;

use super::{message::ChatMessage, reconcile::merge_messages};

/// ライブ配信時に自動スクロールする閾値（下端からの距離, px）
pub const AUTO_SCROLL_THRESHOLD_PX: f64 = 120.0;

/// スクロール領域の寸法
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl Viewport {
    pub fn distance_from_bottom(&self) -> f64 {
        (self.scroll_height - self.scroll_top - self.client_height).max(0.0)
    }

    pub fn is_near_bottom(&self) -> bool {
        self.distance_from_bottom() <= AUTO_SCROLL_THRESHOLD_PX
    }
}

/// 過去方向の読み込み前に記録したスクロール位置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnchor {
    pub previous_scroll_height: f64,
    pub previous_scroll_top: f64,
}

impl ScrollAnchor {
    /// 先頭に追加された分だけずらした scrollTop を返す
    pub fn restore(&self, new_scroll_height: f64) -> f64 {
        self.previous_scroll_top + (new_scroll_height - self.previous_scroll_height)
    }
}

/// 状態遷移の結果として UI が行うべきスクロール操作
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollEffect {
    None,
    SnapToBottom,
    PreserveAnchor(ScrollAnchor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    Loading,
    Loaded { has_more: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// 最新ページ（チャットを開いた直後）
    Initial,
    /// カーソルより古いページ
    Older,
    /// 再接続後の最新ページの取り直し
    Backfill,
}

/// 発行済みの履歴取得
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    chat_id: i64,
    generation: u64,
    kind: FetchKind,
    cursor: Option<String>,
    anchor: Option<ScrollAnchor>,
    was_near_bottom: bool,
    /// 区間を埋める backfill の場合、ここまで届けば埋まったとみなす並び順キー
    gap_floor: Option<(i64, i64)>,
}

impl FetchTicket {
    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    pub fn kind(&self) -> FetchKind {
        self.kind
    }

    /// `None` は最新ページ
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }
}

/// 発行済みの送信
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTicket {
    chat_id: i64,
    generation: u64,
    local_id: Uuid,
    content: String,
}

impl SendTicket {
    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    pub fn local_id(&self) -> Uuid {
        self.local_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// backfill で埋め切れていない区間
///
/// 切断中に 1 ページ以上のメッセージが届いた場合、最新ページと
/// 切断前に保持していた最新メッセージの間に穴が残る。
#[derive(Debug, Clone, PartialEq)]
struct BackfillGap {
    /// このカーソルより古いページを取りに行く
    cursor: String,
    /// 切断前に保持していた最新メッセージの並び順キー
    floor: (i64, i64),
    /// 取得に失敗した。次の過去方向の読み込みで再試行する
    stalled: bool,
}

/// 確定前のローカルエコー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub local_id: Uuid,
    pub content: String,
    /// ローカル時刻（ミリ秒）
    pub created_at: i64,
    /// 送信に失敗した（自動再送はしない）
    pub failed: bool,
}

pub struct ChatView {
    local_user_id: i64,
    chat_id: Option<i64>,
    /// チャットを開くたびに増える。古いチケットの検出に使う
    generation: u64,
    phase: Phase,
    messages: Vec<ChatMessage>,
    cursor: Option<String>,
    has_more: bool,
    fetching: bool,
    is_prepending: bool,
    should_scroll_to_bottom: bool,
    /// 取得中に要求された backfill
    backfill_queued: bool,
    backfill_gap: Option<BackfillGap>,
    /// 取得失敗時に戻すフェーズ
    phase_before_fetch: Phase,
    pending: Vec<PendingMessage>,
}

impl ChatView {
    pub fn new(local_user_id: i64) -> Self {
        Self {
            local_user_id,
            chat_id: None,
            generation: 0,
            phase: Phase::Empty,
            messages: Vec::new(),
            cursor: None,
            has_more: true,
            fetching: false,
            is_prepending: false,
            should_scroll_to_bottom: false,
            backfill_queued: false,
            backfill_gap: None,
            phase_before_fetch: Phase::Empty,
            pending: Vec::new(),
        }
    }

    // ========================================
    // Accessors
    // ========================================

    pub fn chat_id(&self) -> Option<i64> {
        self.chat_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 確定済みメッセージ（`(createdAt, id)` 昇順）
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// 確定前のローカルエコー（確定済みメッセージの後ろに表示する）
    pub fn pending(&self) -> &[PendingMessage] {
        &self.pending
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    pub fn is_prepending(&self) -> bool {
        self.is_prepending
    }

    pub fn should_scroll_to_bottom(&self) -> bool {
        self.should_scroll_to_bottom
    }

    // ========================================
    // Active chat
    // ========================================

    /// アクティブなチャットを切り替え、状態を `Empty` に戻す
    pub fn open(&mut self, chat_id: i64) {
        self.generation += 1;
        self.chat_id = Some(chat_id);
        self.reset();
    }

    /// アクティブなチャットを閉じる
    pub fn close(&mut self) {
        self.generation += 1;
        self.chat_id = None;
        self.reset();
    }

    fn reset(&mut self) {
        self.phase = Phase::Empty;
        self.messages.clear();
        self.cursor = None;
        self.has_more = true;
        self.fetching = false;
        self.is_prepending = false;
        self.should_scroll_to_bottom = false;
        self.backfill_queued = false;
        self.backfill_gap = None;
        self.phase_before_fetch = Phase::Empty;
        self.pending.clear();
    }

    // ========================================
    // History (pull)
    // ========================================

    /// 履歴取得を開始する
    ///
    /// 初回は最新ページ、以降はカーソルより古いページを要求する。
    /// 取得中、または過去の履歴が尽きている場合は `None`（要求を捨てる）。
    /// 失敗して止まっている backfill の区間があれば、そちらを先に再試行する。
    ///
    /// `viewport` は過去方向の読み込みでスクロール位置を保持するために使う。
    pub fn begin_fetch(&mut self, viewport: Option<Viewport>) -> Option<FetchTicket> {
        let chat_id = self.chat_id?;
        if self.fetching {
            return None;
        }
        if self.backfill_gap.as_ref().is_some_and(|gap| gap.stalled) {
            return self.issue_gap_fetch(chat_id);
        }
        if matches!(self.phase, Phase::Loaded { has_more: false }) {
            return None;
        }

        let kind = if self.phase == Phase::Empty {
            FetchKind::Initial
        } else {
            FetchKind::Older
        };
        let anchor = match kind {
            FetchKind::Older => viewport.map(|v| ScrollAnchor {
                previous_scroll_height: v.scroll_height,
                previous_scroll_top: v.scroll_top,
            }),
            _ => None,
        };

        self.is_prepending = kind == FetchKind::Older;
        self.should_scroll_to_bottom = kind == FetchKind::Initial;
        Some(self.issue_fetch(chat_id, kind, anchor, false))
    }

    /// 再接続後に最新ページを取り直す
    ///
    /// カーソルと `has_more` は変更しない。取得中なら完了後に行うよう予約し `None`。
    pub fn begin_backfill(&mut self, viewport: Option<Viewport>) -> Option<FetchTicket> {
        let chat_id = self.chat_id?;
        if self.phase == Phase::Empty && !self.fetching {
            // まだ何も読み込んでいなければ通常の初回読み込みと同じ
            return self.begin_fetch(viewport);
        }
        if self.fetching {
            self.backfill_queued = true;
            return None;
        }
        let near_bottom = viewport.is_none_or(|v| v.is_near_bottom());
        Some(self.issue_fetch(chat_id, FetchKind::Backfill, None, near_bottom))
    }

    /// 続きの backfill（埋め切れていない区間、または取得中に予約されたもの）があれば開始する
    pub fn take_queued_backfill(&mut self, viewport: Option<Viewport>) -> Option<FetchTicket> {
        let chat_id = self.chat_id?;
        if self.fetching {
            return None;
        }
        if self.backfill_gap.as_ref().is_some_and(|gap| !gap.stalled) {
            return self.issue_gap_fetch(chat_id);
        }
        if !self.backfill_queued {
            return None;
        }
        self.backfill_queued = false;
        self.begin_backfill(viewport)
    }

    fn issue_gap_fetch(&mut self, chat_id: i64) -> Option<FetchTicket> {
        let gap = self.backfill_gap.take()?;
        let mut ticket = self.issue_fetch(chat_id, FetchKind::Backfill, None, false);
        ticket.cursor = Some(gap.cursor);
        ticket.gap_floor = Some(gap.floor);
        Some(ticket)
    }

    fn issue_fetch(
        &mut self,
        chat_id: i64,
        kind: FetchKind,
        anchor: Option<ScrollAnchor>,
        was_near_bottom: bool,
    ) -> FetchTicket {
        self.fetching = true;
        self.phase_before_fetch = self.phase;
        if kind != FetchKind::Backfill {
            self.phase = Phase::Loading;
        }
        FetchTicket {
            chat_id,
            generation: self.generation,
            kind,
            cursor: match kind {
                FetchKind::Older => self.cursor.clone(),
                FetchKind::Initial | FetchKind::Backfill => None,
            },
            anchor,
            was_near_bottom,
            gap_floor: None,
        }
    }

    fn is_current(&self, chat_id: i64, generation: u64) -> bool {
        self.chat_id == Some(chat_id) && self.generation == generation
    }

    /// 取得したページを反映する
    ///
    /// `page` は新しい順でも昇順でもよい（マージで並べ直す）。
    /// `next_cursor` が `None` なら過去の履歴は尽きている。
    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket,
        page: Vec<ChatMessage>,
        next_cursor: Option<String>,
    ) -> ScrollEffect {
        if !self.is_current(ticket.chat_id, ticket.generation) {
            tracing::debug!("Discarding history page for inactive chat {}", ticket.chat_id);
            return ScrollEffect::None;
        }

        self.fetching = false;
        let page: Vec<ChatMessage> = page
            .into_iter()
            .filter(|m| m.chat_id == ticket.chat_id)
            .collect();
        let newest_held = self.messages.last().map(ChatMessage::sort_key);
        let page_oldest = page.iter().map(ChatMessage::sort_key).min();
        self.reconcile_own_echoes(&page);
        self.messages = merge_messages(&self.messages, page);

        match ticket.kind {
            FetchKind::Initial | FetchKind::Older => {
                self.has_more = next_cursor.is_some();
                self.cursor = next_cursor;
                self.phase = Phase::Loaded {
                    has_more: self.has_more,
                };
            }
            FetchKind::Backfill => match ticket.gap_floor.or(newest_held) {
                // 何も保持していなかった: 初回読み込みと同じくカーソルを引き継ぐ
                None => {
                    self.has_more = next_cursor.is_some();
                    self.cursor = next_cursor;
                    self.phase = Phase::Loaded {
                        has_more: self.has_more,
                    };
                }
                Some(floor) => {
                    let reached = page_oldest.is_none_or(|oldest| oldest <= floor);
                    if let (false, Some(cursor)) = (reached, next_cursor) {
                        // 止まっている区間が残っていれば、その下端まで続けて埋める
                        let floor = match &self.backfill_gap {
                            Some(gap) => gap.floor.min(floor),
                            None => floor,
                        };
                        tracing::debug!(
                            "Backfill of chat {} left a gap; continuing from {}",
                            ticket.chat_id,
                            cursor
                        );
                        self.backfill_gap = Some(BackfillGap {
                            cursor,
                            floor,
                            stalled: false,
                        });
                    }
                }
            },
        }

        match ticket.kind {
            FetchKind::Initial => {
                self.should_scroll_to_bottom = false;
                ScrollEffect::SnapToBottom
            }
            FetchKind::Older => {
                self.is_prepending = false;
                ticket
                    .anchor
                    .map_or(ScrollEffect::None, ScrollEffect::PreserveAnchor)
            }
            FetchKind::Backfill if ticket.was_near_bottom => ScrollEffect::SnapToBottom,
            FetchKind::Backfill => ScrollEffect::None,
        }
    }

    /// 取得失敗を反映する
    ///
    /// ガードを解除し、`has_more` は変更しない。スクロール操作は発生しない。
    pub fn fail_fetch(&mut self, ticket: &FetchTicket) {
        if !self.is_current(ticket.chat_id, ticket.generation) {
            return;
        }
        self.fetching = false;
        self.is_prepending = false;
        self.should_scroll_to_bottom = false;
        self.phase = self.phase_before_fetch;
        if let (Some(cursor), Some(floor)) = (ticket.cursor.clone(), ticket.gap_floor) {
            self.backfill_gap = Some(BackfillGap {
                cursor,
                floor,
                stalled: true,
            });
        }
    }

    // ========================================
    // Live push
    // ========================================

    /// ライブ配信されたメッセージを反映する
    ///
    /// 追加前に下端から [`AUTO_SCROLL_THRESHOLD_PX`] 以内にいた場合のみ自動スクロールする。
    /// `viewport` が無い場合は下端にいるものとして扱う。
    pub fn apply_live(&mut self, message: ChatMessage, viewport: Option<Viewport>) -> ScrollEffect {
        if self.chat_id != Some(message.chat_id) {
            return ScrollEffect::None;
        }
        let was_near_bottom = viewport.is_none_or(|v| v.is_near_bottom());

        self.reconcile_own_echoes(std::slice::from_ref(&message));
        self.messages = merge_messages(&self.messages, [message]);

        if was_near_bottom {
            ScrollEffect::SnapToBottom
        } else {
            ScrollEffect::None
        }
    }

    // ========================================
    // Optimistic send
    // ========================================

    /// 送信を開始し、ローカルエコーを追加する
    ///
    /// 空白のみの本文、またはアクティブなチャットが無い場合は `None`。
    pub fn begin_send(&mut self, content: &str, now_millis: i64) -> Option<SendTicket> {
        let chat_id = self.chat_id?;
        if content.trim().is_empty() {
            return None;
        }
        let local_id = Uuid::new_v4();
        self.pending.push(PendingMessage {
            local_id,
            content: content.to_string(),
            created_at: now_millis,
            failed: false,
        });
        Some(SendTicket {
            chat_id,
            generation: self.generation,
            local_id,
            content: content.to_string(),
        })
    }

    /// 送信成功：確定メッセージをマージし、ローカルエコーを外す
    ///
    /// 既にブロードキャストのエコーで確定していても重複しない。
    /// 自動スクロールの判定はライブ配信と同じ。
    pub fn confirm_send(
        &mut self,
        ticket: &SendTicket,
        message: ChatMessage,
        viewport: Option<Viewport>,
    ) -> ScrollEffect {
        if !self.is_current(ticket.chat_id, ticket.generation) {
            return ScrollEffect::None;
        }
        let was_near_bottom = viewport.is_none_or(|v| v.is_near_bottom());
        self.pending.retain(|p| p.local_id != ticket.local_id);
        self.messages = merge_messages(&self.messages, [message]);
        if was_near_bottom {
            ScrollEffect::SnapToBottom
        } else {
            ScrollEffect::None
        }
    }

    /// 送信失敗：ローカルエコーを失敗状態にする
    pub fn fail_send(&mut self, ticket: &SendTicket) {
        if !self.is_current(ticket.chat_id, ticket.generation) {
            return;
        }
        if let Some(pending) = self
            .pending
            .iter_mut()
            .find(|p| p.local_id == ticket.local_id)
        {
            pending.failed = true;
        }
    }

    /// 失敗したローカルエコーを取り消す
    pub fn discard_failed(&mut self, local_id: Uuid) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| !(p.local_id == local_id && p.failed));
        self.pending.len() != before
    }

    /// 自分の送信のエコーが送信レスポンスより先に届いた場合、
    /// 同じ本文の最も古いローカルエコーを外す
    fn reconcile_own_echoes(&mut self, incoming: &[ChatMessage]) {
        for message in incoming {
            if message.sender_user_id != self.local_user_id
                || self.messages.iter().any(|m| m.id == message.id)
            {
                continue;
            }
            if let Some(index) = self
                .pending
                .iter()
                .position(|p| !p.failed && p.content == message.content)
            {
                self.pending.remove(index);
            }
        }
    }
}

//! Shared application state.

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::{
    config::JoinPolicy,
    domain::{ChatDirectory, MembershipRepository, MessagePusher, MessageStore, SessionResolver},
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryMembershipRepository,
    },
    usecase::{
        BroadcastMessageUseCase, ConnectConnectionUseCase, DisconnectConnectionUseCase,
        FetchHistoryUseCase, JoinRoomUseCase, LeaveRoomUseCase, ListChatsUseCase,
        MarkReadUseCase, SendMessageUseCase,
    },
};

/// External collaborators the server depends on
pub struct Collaborators {
    /// SessionResolver（認証の抽象化）
    pub sessions: Arc<dyn SessionResolver>,
    /// MessageStore（永続化の抽象化）
    pub store: Arc<dyn MessageStore>,
    /// ChatDirectory（チャット一覧・メンバー判定の抽象化）
    pub directory: Arc<dyn ChatDirectory>,
    pub clock: Arc<dyn Clock>,
}

/// Shared application state
pub struct AppState {
    pub connect_connection_usecase: Arc<ConnectConnectionUseCase>,
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    pub leave_room_usecase: Arc<LeaveRoomUseCase>,
    pub disconnect_connection_usecase: Arc<DisconnectConnectionUseCase>,
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub fetch_history_usecase: Arc<FetchHistoryUseCase>,
    pub mark_read_usecase: Arc<MarkReadUseCase>,
    pub list_chats_usecase: Arc<ListChatsUseCase>,
    /// 接続数（ヘルスチェック用）
    pub message_pusher: Arc<dyn MessagePusher>,
    /// ルーム数（ヘルスチェック用）
    pub membership: Arc<dyn MembershipRepository>,
}

impl AppState {
    /// Wire the use cases on top of the given collaborators.
    ///
    /// The membership table and the message pusher are process-local and
    /// created here.
    pub fn new(collaborators: Collaborators, join_policy: JoinPolicy) -> Self {
        let Collaborators {
            sessions,
            store,
            directory,
            clock,
        } = collaborators;

        let membership: Arc<dyn MembershipRepository> =
            Arc::new(InMemoryMembershipRepository::new());
        let message_pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());

        let broadcaster = Arc::new(BroadcastMessageUseCase::new(
            membership.clone(),
            message_pusher.clone(),
        ));

        Self {
            connect_connection_usecase: Arc::new(ConnectConnectionUseCase::new(
                sessions,
                message_pusher.clone(),
                clock,
            )),
            join_room_usecase: Arc::new(JoinRoomUseCase::new(
                membership.clone(),
                directory.clone(),
                join_policy,
            )),
            leave_room_usecase: Arc::new(LeaveRoomUseCase::new(membership.clone())),
            disconnect_connection_usecase: Arc::new(DisconnectConnectionUseCase::new(
                membership.clone(),
                message_pusher.clone(),
            )),
            send_message_usecase: Arc::new(SendMessageUseCase::new(store.clone(), broadcaster)),
            fetch_history_usecase: Arc::new(FetchHistoryUseCase::new(
                store.clone(),
                directory.clone(),
            )),
            mark_read_usecase: Arc::new(MarkReadUseCase::new(store)),
            list_chats_usecase: Arc::new(ListChatsUseCase::new(directory)),
            message_pusher,
            membership,
        }
    }
}

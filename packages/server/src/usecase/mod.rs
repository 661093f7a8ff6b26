//! UseCase 層
//!
//! 接続・ルーム参加/退出・切断・送信とファンアウト・履歴取得・既読化・チャット一覧を
//! それぞれ 1 つのユースケースとして表現します。

mod broadcast_message;
mod connect_connection;
mod disconnect_connection;
mod error;
mod fetch_history;
mod join_room;
mod leave_room;
mod list_chats;
mod mark_read;
mod send_message;

pub use broadcast_message::BroadcastMessageUseCase;
pub use connect_connection::ConnectConnectionUseCase;
pub use disconnect_connection::DisconnectConnectionUseCase;
pub use error::{
    BroadcastError, ConnectError, FetchHistoryError, JoinRoomError, ListChatsError,
    MarkReadError, SendMessageError,
};
pub use fetch_history::FetchHistoryUseCase;
pub use join_room::{JoinOutcome, JoinRoomUseCase};
pub use leave_room::LeaveRoomUseCase;
pub use list_chats::ListChatsUseCase;
pub use mark_read::MarkReadUseCase;
pub use send_message::SendMessageUseCase;

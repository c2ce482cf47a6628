//! Server state shared by every connection handler.

use std::sync::Arc;

use crate::usecase::{ConnectParticipantUseCase, DisconnectParticipantUseCase, SendMessageUseCase};

/// Shared application state
pub struct AppState {
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// DisconnectParticipantUseCase（参加者切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// 受信 1 行の最大バイト数
    pub max_line_length: usize,
    /// 接続ごとの送信キューの容量
    pub outbound_queue_capacity: usize,
}

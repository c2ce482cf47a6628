//! Registry trait 定義
//!
//! 接続中の参加者集合へのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use super::{ConnectionId, DisplayName, Participant};

/// Why a line could not be queued for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PushError {
    /// The peer is not reading fast enough to keep up
    #[error("outbound queue is full")]
    Full,

    /// The writer has terminated or the connection was dropped
    #[error("outbound queue is closed")]
    Closed,
}

/// Outbound queue of one connection.
///
/// Every line pushed here is written to the socket by that connection's
/// writer task. The queue is bounded: a failed push means the peer is
/// unreachable, either because its writer is gone or because it stopped
/// reading and the queue filled up.
#[derive(Debug, Clone)]
pub struct OutboundChannel {
    lines: mpsc::Sender<String>,
    dropped: CancellationToken,
}

impl OutboundChannel {
    /// Create a queue holding at most `capacity` unsent lines (at least one)
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (lines, rx) = mpsc::channel(capacity.max(1));
        let channel = Self {
            lines,
            dropped: CancellationToken::new(),
        };
        (channel, rx)
    }

    /// Queue a line without waiting
    pub fn push(&self, line: impl Into<String>) -> Result<(), PushError> {
        if self.dropped.is_cancelled() {
            return Err(PushError::Closed);
        }
        self.lines.try_send(line.into()).map_err(|e| match e {
            TrySendError::Full(_) => PushError::Full,
            TrySendError::Closed(_) => PushError::Closed,
        })
    }

    /// Give up on this connection: later pushes fail, and the writer and
    /// reader of the connection stop without flushing what is queued.
    pub fn drop_connection(&self) {
        self.dropped.cancel();
    }

    /// Whether `drop_connection` has been called on any clone
    pub fn is_dropped(&self) -> bool {
        self.dropped.is_cancelled()
    }

    /// Token cancelled by `drop_connection`, for tasks that must not hold a
    /// sender of the queue
    pub fn dropped_token(&self) -> CancellationToken {
        self.dropped.clone()
    }
}

/// Result of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Number of connections the message was queued for
    pub delivered: usize,
    /// Participants removed because delivery to them failed
    pub evicted: Vec<Participant>,
}

/// Participant Registry trait
///
/// 参加者集合の全ての読み書きはこの trait を経由し、単一の排他境界の中で行われる。
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParticipantRegistry: Send + Sync {
    /// 参加者を登録する。返った時点で以降のブロードキャストの対象になる
    async fn register(
        &self,
        id: ConnectionId,
        name: DisplayName,
        outbound: OutboundChannel,
    ) -> Participant;

    /// 参加者を削除する。登録されていなければ何もせず `None` を返す（冪等）
    async fn unregister(&self, id: &ConnectionId) -> Option<Participant>;

    /// `exclude` 以外の全参加者にメッセージを配送する
    ///
    /// 配送に失敗した参加者は暗黙の切断として削除され、残りの参加者に
    /// 強制切断の通知が配送される。
    async fn broadcast(&self, message: &str, exclude: Option<ConnectionId>) -> BroadcastReport;

    /// 接続中の参加者数を取得
    async fn count(&self) -> usize;

    /// 接続中の参加者のスナップショットを取得
    async fn participants(&self) -> Vec<Participant>;
}

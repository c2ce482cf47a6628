//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 受信フレームの分類（退出・空行・チャット）とブロードキャスト
//!
//! ### なぜこのテストが必要か
//! - "exit" がチャットとして中継されないことを保証する
//! - 送信者自身にはメッセージが返らないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：チャットの中継
//! - エッジケース：空白のみのフレーム、大文字の "EXIT"

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::domain::{Announcement, BroadcastReport, Frame, Participant, ParticipantRegistry};

/// 1 フレームを処理した結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// チャットとして他の参加者に中継した
    Relayed(BroadcastReport),
    /// 空白のみのため破棄した
    Ignored,
    /// 参加者が退出を要求した
    Exit,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// Registry（参加者集合の抽象化）
    registry: Arc<dyn ParticipantRegistry>,
    /// メッセージのタイムスタンプ用
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(registry: Arc<dyn ParticipantRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// 受信フレームを処理する
    ///
    /// # Arguments
    ///
    /// * `sender` - フレームを送ってきた参加者
    /// * `raw_frame` - 受信したテキスト
    pub async fn execute(&self, sender: &Participant, raw_frame: &str) -> FrameOutcome {
        match Frame::classify(raw_frame) {
            Frame::Exit => FrameOutcome::Exit,
            Frame::Blank => FrameOutcome::Ignored,
            Frame::Chat(body) => {
                let line = Announcement::chat(self.clock.now(), &sender.name, body).render();
                tracing::debug!("Relaying from '{}': {}", sender.name, body);
                let report = self.registry.broadcast(&line, Some(sender.id)).await;
                FrameOutcome::Relayed(report)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectionId, DisplayName, MockParticipantRegistry};
    use chrono::{FixedOffset, TimeZone};
    use hiroba_shared::time::FixedClock;
    use mockall::predicate::eq;

    fn fixed_clock() -> Arc<dyn Clock> {
        let at = FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 1, 1, 8, 15, 0)
            .unwrap();
        Arc::new(FixedClock::new(at))
    }

    fn alice() -> Participant {
        Participant::new(
            ConnectionId::generate(),
            DisplayName::try_from("alice").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_chat_is_broadcast_excluding_sender() {
        // テスト項目: チャットは整形され、送信者を除いてブロードキャストされる
        // given (前提条件):
        let sender = alice();
        let mut registry = MockParticipantRegistry::new();
        registry
            .expect_broadcast()
            .with(eq("[08:15 AM] alice: hi there"), eq(Some(sender.id)))
            .times(1)
            .returning(|_, _| BroadcastReport {
                delivered: 2,
                evicted: Vec::new(),
            });
        let usecase = SendMessageUseCase::new(Arc::new(registry), fixed_clock());

        // when (操作):
        let outcome = usecase.execute(&sender, "  hi there ").await;

        // then (期待する結果):
        assert_eq!(
            outcome,
            FrameOutcome::Relayed(BroadcastReport {
                delivered: 2,
                evicted: Vec::new(),
            })
        );
    }

    #[tokio::test]
    async fn test_exit_is_not_broadcast() {
        // テスト項目: "exit"（大文字小文字問わず）は中継されず退出として扱われる
        // given (前提条件):
        let sender = alice();
        let mut registry = MockParticipantRegistry::new();
        registry.expect_broadcast().never();
        let usecase = SendMessageUseCase::new(Arc::new(registry), fixed_clock());

        // when (操作):
        let lower = usecase.execute(&sender, "exit").await;
        let upper = usecase.execute(&sender, "EXIT").await;

        // then (期待する結果):
        assert_eq!(lower, FrameOutcome::Exit);
        assert_eq!(upper, FrameOutcome::Exit);
    }

    #[tokio::test]
    async fn test_blank_frame_is_ignored() {
        // テスト項目: 空白のみのフレームは破棄される
        // given (前提条件):
        let sender = alice();
        let mut registry = MockParticipantRegistry::new();
        registry.expect_broadcast().never();
        let usecase = SendMessageUseCase::new(Arc::new(registry), fixed_clock());

        // when (操作):
        let outcome = usecase.execute(&sender, " \t").await;

        // then (期待する結果):
        assert_eq!(outcome, FrameOutcome::Ignored);
    }
}

//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - 参加者の削除、接続のクローズ、退室通知の順序
//!
//! ### なぜこのテストが必要か
//! - 退室通知が残りの参加者にちょうど 1 回だけ届くことを保証する
//! - ブロードキャスト中に既に削除された参加者について二重通知しないことを確認
//! - 退室通知が接続を閉じた後に出ることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の削除と退室通知
//! - エッジケース：既に Registry から削除されている接続

use std::{future::Future, sync::Arc};

use hiroba_shared::time::Clock;

use crate::domain::{Announcement, ConnectionId, Participant, ParticipantRegistry};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    /// Registry（参加者集合の抽象化）
    registry: Arc<dyn ParticipantRegistry>,
    /// 通知のタイムスタンプ用
    clock: Arc<dyn Clock>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(registry: Arc<dyn ParticipantRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// 参加者切断を実行
    ///
    /// 削除、`close_transport` の完了、退室通知の順に行う。
    /// `close_transport` は削除済みかどうかに関わらず必ず待つ。
    ///
    /// # Returns
    ///
    /// * `Some(Participant)` - この呼び出しで削除した参加者（退室通知済み）
    /// * `None` - 既に削除されていた（強制切断通知が出ているため通知しない）
    pub async fn execute<F>(&self, id: &ConnectionId, close_transport: F) -> Option<Participant>
    where
        F: Future<Output = ()> + Send,
    {
        // 1. Registry から削除（この呼び出しが削除した場合だけ通知する）
        let removed = self.registry.unregister(id).await;

        // 2. 接続を閉じる
        close_transport.await;

        // 3. 残りの参加者に退室を通知
        let participant = removed?;
        let notice = Announcement::left(self.clock.now(), &participant.name);
        self.registry.broadcast(&notice.render(), None).await;

        Some(participant)
    }
}

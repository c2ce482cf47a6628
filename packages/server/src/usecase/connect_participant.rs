//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - ハンドシェイクの表示名検証、歓迎メッセージ、参加者登録、入室通知
//!
//! ### なぜこのテストが必要か
//! - 不正なハンドシェイクでは登録も通知も行われないことを保証する
//! - 入室通知が新しい参加者自身には届かないことを確認
//! - 歓迎メッセージが他の参加者のメッセージより先に届くことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：登録と入室通知
//! - 異常系：空の表示名、予約された表示名

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::domain::{
    Announcement, ConnectionId, DisplayName, OutboundChannel, Participant, ParticipantRegistry,
    WELCOME,
};

use super::error::ConnectError;

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    /// Registry（参加者集合の抽象化）
    registry: Arc<dyn ParticipantRegistry>,
    /// 通知のタイムスタンプ用
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(registry: Arc<dyn ParticipantRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// ハンドシェイクを完了し参加者を登録する
    ///
    /// # Arguments
    ///
    /// * `id` - 接続 ID
    /// * `raw_name` - ハンドシェイクで受け取ったフレーム（前後の空白は除去される）
    /// * `outbound` - この接続の送信キュー
    ///
    /// # Returns
    ///
    /// * `Ok(Participant)` - 登録された参加者
    /// * `Err(ConnectError)` - 表示名が不正（登録も通知も行われない）
    pub async fn execute(
        &self,
        id: ConnectionId,
        raw_name: &str,
        outbound: OutboundChannel,
    ) -> Result<Participant, ConnectError> {
        // 1. 表示名を検証
        let name = DisplayName::try_from(raw_name)?;

        // 2. 登録前にキューへ積むことで、他の参加者のメッセージより先に届く
        //    失敗しても writer が終了しているだけなので、読み込み側で接続が閉じられる
        if let Err(e) = outbound.push(WELCOME) {
            tracing::debug!("Could not queue welcome for connection {}: {}", id, e);
        }

        // 3. Registry に登録
        let participant = self.registry.register(id, name, outbound).await;

        // 4. 本人以外に入室を通知
        let notice = Announcement::joined(self.clock.now(), &participant.name);
        self.registry.broadcast(&notice.render(), Some(id)).await;

        Ok(participant)
    }
}

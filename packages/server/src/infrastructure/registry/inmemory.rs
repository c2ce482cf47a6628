//! InMemory Participant Registry 実装
//!
//! ドメイン層が定義する ParticipantRegistry trait の具体的な実装。
//! 接続 ID から参加者と送信キューへのマップを単一の `Mutex` で保護します。
//!
//! ## 配送失敗時の扱い
//!
//! ブロードキャスト中に送信キューへの push が失敗した接続（writer が終了済み、
//! または読まない相手でキューが満杯）は削除されて接続ごと切り捨てられ、
//! 残りの参加者に強制切断の通知が配送されます。通知の配送自体が更に失敗を
//! 起こしても、再帰ではなくロック内の作業キューで処理するため、同じ接続が
//! 二度削除・通知されることはありません。

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use async_trait::async_trait;
use hiroba_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    Announcement, BroadcastReport, ConnectionId, DisplayName, OutboundChannel, Participant,
    ParticipantRegistry, PushError,
};

struct Entry {
    participant: Participant,
    outbound: OutboundChannel,
}

/// インメモリ Participant Registry 実装
pub struct InMemoryParticipantRegistry {
    /// 接続中の参加者
    ///
    /// Key: ConnectionId
    /// Value: 参加者と送信キュー
    entries: Mutex<HashMap<ConnectionId, Entry>>,
    /// 強制切断通知のタイムスタンプ用
    clock: Arc<dyn Clock>,
}

impl InMemoryParticipantRegistry {
    /// 新しい InMemoryParticipantRegistry を作成
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

/// Queue `line` for every entry except `exclude`.
///
/// Returns the number of successful pushes and the ids whose push failed.
fn fan_out(
    entries: &HashMap<ConnectionId, Entry>,
    line: &str,
    exclude: Option<ConnectionId>,
) -> (usize, Vec<(ConnectionId, PushError)>) {
    let mut delivered = 0;
    let mut failed = Vec::new();

    for (id, entry) in entries.iter() {
        if Some(*id) == exclude {
            continue;
        }
        match entry.outbound.push(line) {
            Ok(()) => delivered += 1,
            Err(e) => failed.push((*id, e)),
        }
    }

    (delivered, failed)
}

#[async_trait]
impl ParticipantRegistry for InMemoryParticipantRegistry {
    async fn register(
        &self,
        id: ConnectionId,
        name: DisplayName,
        outbound: OutboundChannel,
    ) -> Participant {
        let participant = Participant::new(id, name);

        let mut entries = self.entries.lock().await;
        entries.insert(
            id,
            Entry {
                participant: participant.clone(),
                outbound,
            },
        );
        tracing::debug!(
            "Participant '{}' registered on connection {} ({} live)",
            participant.name,
            id,
            entries.len()
        );

        participant
    }

    async fn unregister(&self, id: &ConnectionId) -> Option<Participant> {
        let mut entries = self.entries.lock().await;
        let removed = entries.remove(id).map(|entry| entry.participant);
        if let Some(participant) = &removed {
            tracing::debug!(
                "Participant '{}' unregistered from connection {} ({} live)",
                participant.name,
                id,
                entries.len()
            );
        }
        removed
    }

    async fn broadcast(&self, message: &str, exclude: Option<ConnectionId>) -> BroadcastReport {
        let mut entries = self.entries.lock().await;

        let (delivered, mut failed) = fan_out(&entries, message, exclude);
        let mut report = BroadcastReport {
            delivered,
            evicted: Vec::new(),
        };

        // Each pass evicts the failed targets and queues one notice per
        // eviction for whoever is still live at that point.
        let mut notices = VecDeque::new();
        loop {
            for (id, reason) in failed.drain(..) {
                if let Some(entry) = entries.remove(&id) {
                    tracing::warn!(
                        "Failed to deliver to '{}' on connection {} ({}), removing participant",
                        entry.participant.name,
                        id,
                        reason
                    );
                    entry.outbound.drop_connection();
                    notices.push_back(
                        Announcement::disconnected_unexpectedly(
                            self.clock.now(),
                            &entry.participant.name,
                        )
                        .render(),
                    );
                    report.evicted.push(entry.participant);
                }
            }

            let Some(notice) = notices.pop_front() else {
                break;
            };
            let (_, newly_failed) = fan_out(&entries, &notice, None);
            failed = newly_failed;
        }

        report
    }

    async fn count(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.len()
    }

    async fn participants(&self) -> Vec<Participant> {
        let entries = self.entries.lock().await;
        entries
            .values()
            .map(|entry| entry.participant.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use hiroba_shared::time::FixedClock;
    use tokio::sync::mpsc;

    const TEST_QUEUE_CAPACITY: usize = 16;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - InMemoryParticipantRegistry の登録・削除・ブロードキャスト
    // - 配送失敗時の暗黙の切断と強制切断通知
    //
    // 【なぜこのテストが必要か】
    // - Registry は全ハンドラから並行に呼ばれる共有状態の唯一の持ち主
    // - 配送失敗の連鎖で二重削除・二重通知が起きないことを保証する必要がある
    //
    // 【どのようなシナリオをテストするか】
    // 1. 並行登録で取りこぼし・二重登録がないこと
    // 2. 未登録の接続の削除は no-op
    // 3. exclude 指定の接続には配送されない
    // 4. 配送失敗で 1 回だけ削除・通知される
    // 5. 通知の配送自体が失敗する連鎖も 1 回ずつ処理される
    // ========================================

    fn create_test_registry() -> InMemoryParticipantRegistry {
        let at = FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 1, 1, 9, 30, 0)
            .unwrap();
        InMemoryParticipantRegistry::new(Arc::new(FixedClock::new(at)))
    }

    fn name(raw: &str) -> DisplayName {
        DisplayName::try_from(raw).unwrap()
    }

    async fn join(
        registry: &InMemoryParticipantRegistry,
        raw_name: &str,
    ) -> (ConnectionId, mpsc::Receiver<String>) {
        join_with_capacity(registry, raw_name, TEST_QUEUE_CAPACITY).await
    }

    async fn join_with_capacity(
        registry: &InMemoryParticipantRegistry,
        raw_name: &str,
        capacity: usize,
    ) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = ConnectionId::generate();
        let (outbound, rx) = OutboundChannel::new(capacity);
        registry.register(id, name(raw_name), outbound).await;
        (id, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_concurrent_register_counts_every_participant() {
        // テスト項目: 並行に登録しても全員がちょうど 1 回ずつ登録される
        // given (前提条件):
        let registry = Arc::new(create_test_registry());
        let n = 32;

        // when (操作):
        let tasks: Vec<_> = (0..n)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let (outbound, rx) = OutboundChannel::new(TEST_QUEUE_CAPACITY);
                    registry
                        .register(
                            ConnectionId::generate(),
                            name(&format!("user{}", i)),
                            outbound,
                        )
                        .await;
                    rx
                })
            })
            .collect();
        let mut receivers = Vec::new();
        for task in tasks {
            receivers.push(task.await.unwrap());
        }

        // then (期待する結果):
        assert_eq!(registry.count().await, n);
        assert_eq!(registry.participants().await.len(), n);
    }

    #[tokio::test]
    async fn test_duplicate_names_are_separate_participants() {
        // テスト項目: 同じ表示名でも接続ごとに別の参加者として登録される
        // given (前提条件):
        let registry = create_test_registry();

        // when (操作):
        let (_a, _rx_a) = join(&registry, "alice").await;
        let (_b, _rx_b) = join(&registry, "alice").await;

        // then (期待する結果):
        assert_eq!(registry.count().await, 2);
    }

    #[tokio::test]
    async fn test_unregister_returns_participant_once() {
        // テスト項目: 削除は最初の 1 回だけ参加者を返し、以降は None（冪等）
        // given (前提条件):
        let registry = create_test_registry();
        let (id, _rx) = join(&registry, "alice").await;

        // when (操作):
        let first = registry.unregister(&id).await;
        let second = registry.unregister(&id).await;

        // then (期待する結果):
        assert_eq!(first.map(|p| p.name.to_string()), Some("alice".to_string()));
        assert!(second.is_none());
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_unregister_unknown_connection_is_noop() {
        // テスト項目: 未登録の接続を削除しても件数は変わらずエラーにもならない
        // given (前提条件):
        let registry = create_test_registry();
        let (_id, _rx) = join(&registry, "alice").await;

        // when (操作):
        let removed = registry.unregister(&ConnectionId::generate()).await;

        // then (期待する結果):
        assert!(removed.is_none());
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_broadcast_skips_excluded_connection() {
        // テスト項目: exclude 指定した接続以外の全員に配送される
        // given (前提条件):
        let registry = create_test_registry();
        let (alice, mut rx_alice) = join(&registry, "alice").await;
        let (_bob, mut rx_bob) = join(&registry, "bob").await;
        let (_carol, mut rx_carol) = join(&registry, "carol").await;

        // when (操作):
        let report = registry.broadcast("hello", Some(alice)).await;

        // then (期待する結果):
        assert_eq!(report.delivered, 2);
        assert!(report.evicted.is_empty());
        assert!(drain(&mut rx_alice).is_empty());
        assert_eq!(drain(&mut rx_bob), vec!["hello".to_string()]);
        assert_eq!(drain(&mut rx_carol), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_broadcast_without_exclude_reaches_everyone() {
        // テスト項目: exclude なしのブロードキャストは全員に届く
        // given (前提条件):
        let registry = create_test_registry();
        let (_alice, mut rx_alice) = join(&registry, "alice").await;
        let (_bob, mut rx_bob) = join(&registry, "bob").await;

        // when (操作):
        let report = registry.broadcast("notice", None).await;

        // then (期待する結果):
        assert_eq!(report.delivered, 2);
        assert_eq!(drain(&mut rx_alice), vec!["notice".to_string()]);
        assert_eq!(drain(&mut rx_bob), vec!["notice".to_string()]);
    }

    #[tokio::test]
    async fn test_broadcast_evicts_unreachable_participant_once() {
        // テスト項目: 配送に失敗した参加者は削除され、強制切断通知がちょうど 1 回だけ出る
        // given (前提条件):
        let registry = create_test_registry();
        let (alice, mut rx_alice) = join(&registry, "alice").await;
        let (_bob, mut rx_bob) = join(&registry, "bob").await;
        let (dave, rx_dave) = join(&registry, "dave").await;
        drop(rx_dave); // dave の writer が終了した状態

        // when (操作):
        let report = registry.broadcast("[09:30 AM] alice: hi", Some(alice)).await;
        let later = registry.broadcast("[09:30 AM] bob: again", None).await;

        // then (期待する結果):
        assert_eq!(report.delivered, 1);
        assert_eq!(report.evicted.len(), 1);
        assert_eq!(report.evicted[0].id, dave);
        assert!(later.evicted.is_empty());
        assert_eq!(registry.count().await, 2);
        assert!(registry.unregister(&dave).await.is_none());

        let notice = "[09:30 AM] Server: dave has been disconnected unexpectedly.".to_string();
        assert_eq!(
            drain(&mut rx_bob),
            vec![
                "[09:30 AM] alice: hi".to_string(),
                notice.clone(),
                "[09:30 AM] bob: again".to_string(),
            ]
        );
        // 送信者自身も強制切断通知は受け取る
        assert_eq!(
            drain(&mut rx_alice),
            vec![notice, "[09:30 AM] bob: again".to_string()]
        );
    }

    #[tokio::test]
    async fn test_broadcast_evicts_participant_whose_queue_is_full() {
        // テスト項目: 読まない参加者のキューが満杯になると削除され、接続ごと切り捨てられる
        // given (前提条件):
        let registry = create_test_registry();
        let (_alice, mut rx_alice) = join(&registry, "alice").await;
        let id = ConnectionId::generate();
        let (outbound, _rx_stalled) = OutboundChannel::new(1);
        registry
            .register(id, name("stalled"), outbound.clone())
            .await;
        let first = registry.broadcast("first", None).await;

        // when (操作):
        let second = registry.broadcast("second", None).await;

        // then (期待する結果):
        assert!(first.evicted.is_empty());
        assert_eq!(second.evicted.len(), 1);
        assert_eq!(second.evicted[0].id, id);
        assert!(outbound.is_dropped());
        assert_eq!(registry.count().await, 1);
        assert_eq!(
            drain(&mut rx_alice),
            vec![
                "first".to_string(),
                "second".to_string(),
                "[09:30 AM] Server: stalled has been disconnected unexpectedly.".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_notice_overflowing_another_queue_cascades_once() {
        // テスト項目: 強制切断通知で別の参加者のキューが溢れても、それぞれ 1 回だけ削除・通知される
        // given (前提条件):
        let registry = create_test_registry();
        let (_alice, mut rx_alice) = join(&registry, "alice").await;
        let (dave, rx_dave) = join(&registry, "dave").await;
        drop(rx_dave);
        let (_erin, _rx_erin) = join_with_capacity(&registry, "erin", 1).await;

        // when (操作):
        let report = registry.broadcast("ping", None).await;

        // then (期待する結果):
        let evicted: Vec<String> = report.evicted.iter().map(|p| p.name.to_string()).collect();
        assert_eq!(evicted, vec!["dave".to_string(), "erin".to_string()]);
        assert!(registry.unregister(&dave).await.is_none());
        assert_eq!(registry.count().await, 1);
        assert_eq!(
            drain(&mut rx_alice),
            vec![
                "ping".to_string(),
                "[09:30 AM] Server: dave has been disconnected unexpectedly.".to_string(),
                "[09:30 AM] Server: erin has been disconnected unexpectedly.".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_broadcast_handles_many_failures_without_duplicates() {
        // テスト項目: 複数の配送失敗が同時に起きても各参加者は 1 回ずつ削除・通知される
        // given (前提条件):
        let registry = create_test_registry();
        let (_alice, mut rx_alice) = join(&registry, "alice").await;
        let mut dead = Vec::new();
        for raw in ["bob", "carol", "dave"] {
            let (id, rx) = join(&registry, raw).await;
            drop(rx);
            dead.push(id);
        }

        // when (操作):
        let report = registry.broadcast("ping", None).await;

        // then (期待する結果):
        assert_eq!(report.delivered, 1);
        assert_eq!(report.evicted.len(), 3);
        assert_eq!(registry.count().await, 1);

        let received = drain(&mut rx_alice);
        assert_eq!(received[0], "ping");
        let notices: Vec<&String> = received
            .iter()
            .filter(|line| line.contains("has been disconnected unexpectedly"))
            .collect();
        assert_eq!(notices.len(), 3);
        for raw in ["bob", "carol", "dave"] {
            assert_eq!(
                notices
                    .iter()
                    .filter(|line| line.contains(&format!("Server: {} has", raw)))
                    .count(),
                1
            );
        }
    }

    #[tokio::test]
    async fn test_broadcast_to_empty_registry() {
        // テスト項目: 参加者がいなくてもエラーにならない
        // given (前提条件):
        let registry = create_test_registry();

        // when (操作):
        let report = registry.broadcast("anyone?", None).await;

        // then (期待する結果):
        assert_eq!(report, BroadcastReport::default());
    }
}

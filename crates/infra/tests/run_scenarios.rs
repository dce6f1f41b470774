//! End-to-end runs over in-memory collaborators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use stockwatch_alerts::{MessagePayload, PipelineConfig};
use stockwatch_core::{RunId, StreamId};
use stockwatch_infra::notify::render_summary;
use stockwatch_infra::{
    BalanceCheckSpec, DeliveryOutcome, FailedDelivery, FailedDeliveryLog, FetchError, InMemorySnapshotStore,
    NotifierError, Orchestrator, RecordingNotifier, Redelivery, RunError, SnapshotSource, SnapshotStore,
    StoreError, StreamSpec, WatchConfig, watch,
};
use stockwatch_inventory::{
    InvalidCells, Item, ItemKey, Quantity, RecordsBalance, RecordsLayout, SheetLayout, Snapshot, UnitPolicy,
};

enum Reply {
    Snapshot(Vec<(&'static str, f64)>),
    /// Readable items plus keys whose cells could not be parsed.
    Partial(Vec<(&'static str, f64)>, Vec<&'static str>),
    Ready(Snapshot),
    Down,
}

/// Serves scripted snapshots per stream; the last reply repeats.
#[derive(Default)]
struct ScriptedSource {
    replies: Mutex<HashMap<String, Vec<Reply>>>,
    balance: Mutex<Option<f64>>,
    fetches: Mutex<u32>,
}

impl ScriptedSource {
    fn new() -> Self {
        Self::default()
    }

    fn reply(self, stream: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(stream.to_string())
            .or_default()
            .push(reply);
        self
    }

    fn with_balance(self, balance: f64) -> Self {
        *self.balance.lock().unwrap() = Some(balance);
        self
    }

    fn fetches(&self) -> u32 {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch(&self, spec: &StreamSpec) -> Result<Snapshot, FetchError> {
        *self.fetches.lock().unwrap() += 1;
        let mut replies = self.replies.lock().unwrap();
        let queue = replies
            .get_mut(spec.id.as_str())
            .ok_or_else(|| FetchError::Network("unknown stream".into()))?;
        let reply = queue.remove(0);
        let result = match &reply {
            Reply::Snapshot(items) => Ok(snapshot(spec.id.as_str(), items)),
            Reply::Partial(items, unreadable) => Ok(snapshot(spec.id.as_str(), items)
                .with_unreadable(unreadable.iter().map(|k| ItemKey::new(*k).unwrap()))),
            Reply::Ready(snapshot) => Ok(snapshot.clone()),
            Reply::Down => Err(FetchError::Network("connection reset".into())),
        };
        if queue.is_empty() {
            queue.push(reply);
        }
        result
    }

    async fn fetch_balance(&self, check: &BalanceCheckSpec, period: &str) -> Result<RecordsBalance, FetchError> {
        let balance = self
            .balance
            .lock()
            .unwrap()
            .ok_or_else(|| FetchError::Api {
                status: 404,
                body: format!("no {}", check.range),
            })?;
        Ok(RecordsBalance {
            period: period.to_string(),
            balance,
            exact_period: true,
        })
    }
}

/// Store whose persisted bytes are unreadable.
struct CorruptStore(InMemorySnapshotStore);

impl SnapshotStore for CorruptStore {
    fn load(&self, stream: &StreamId) -> Result<Option<Snapshot>, StoreError> {
        Err(StoreError::Corrupt {
            stream: stream.clone(),
            reason: "invalid load key, '\\x80'".into(),
        })
    }

    fn save(&self, stream: &StreamId, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.0.save(stream, snapshot)
    }
}

/// Store that reads fine but cannot persist.
struct FailingSaveStore(InMemorySnapshotStore);

impl SnapshotStore for FailingSaveStore {
    fn load(&self, stream: &StreamId) -> Result<Option<Snapshot>, StoreError> {
        self.0.load(stream)
    }

    fn save(&self, stream: &StreamId, _snapshot: &Snapshot) -> Result<(), StoreError> {
        Err(StoreError::Io {
            stream: stream.clone(),
            source: std::io::Error::new(std::io::ErrorKind::StorageFull, "no space left on device"),
        })
    }
}

/// Store that cannot be read at all.
struct UnreadableStore;

impl SnapshotStore for UnreadableStore {
    fn load(&self, stream: &StreamId) -> Result<Option<Snapshot>, StoreError> {
        Err(StoreError::Io {
            stream: stream.clone(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        })
    }

    fn save(&self, _stream: &StreamId, _snapshot: &Snapshot) -> Result<(), StoreError> {
        panic!("save must not be reached after a failed load");
    }
}

fn sid(id: &str) -> StreamId {
    StreamId::new(id).unwrap()
}

fn snapshot(stream: &str, items: &[(&str, f64)]) -> Snapshot {
    Snapshot::new(
        sid(stream),
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap(),
        items
            .iter()
            .map(|(k, q)| Item::new(ItemKey::new(*k).unwrap(), Quantity::new(*q).unwrap())),
    )
    .unwrap()
}

fn spec(id: &str) -> StreamSpec {
    StreamSpec {
        id: sid(id),
        title: "Stock".to_string(),
        spreadsheet_id: "sheet".to_string(),
        range: "balance!A1:P3".to_string(),
        layout: SheetLayout::Columns {
            labels_row: 0,
            values_row: 1,
            first_column: 0,
            skip_labels: Vec::new(),
            pinned: Vec::new(),
        },
        units: UnitPolicy::default(),
        pieces_per_bag: None,
        balance_check: None,
        invalid_cells: InvalidCells::Reject,
    }
}

fn with_balance_check(mut spec: StreamSpec) -> StreamSpec {
    spec.balance_check = Some(BalanceCheckSpec {
        spreadsheet_id: "records".to_string(),
        range: "summary!A:Z".to_string(),
        records: RecordsLayout {
            period_column: "year_month".to_string(),
            balance_column: "chicken_quantity_stock_balance".to_string(),
        },
        exclude_keys: vec!["Total".to_string()],
    });
    spec
}

type Harness = Orchestrator<Arc<ScriptedSource>, Arc<InMemorySnapshotStore>, Arc<RecordingNotifier>>;

fn harness(
    specs: Vec<StreamSpec>,
    source: ScriptedSource,
    store: InMemorySnapshotStore,
    notifier: RecordingNotifier,
) -> (Harness, Arc<ScriptedSource>, Arc<InMemorySnapshotStore>, Arc<RecordingNotifier>) {
    let source = Arc::new(source);
    let store = Arc::new(store);
    let notifier = Arc::new(notifier);
    let orchestrator = Orchestrator::new(
        specs,
        &PipelineConfig::default(),
        source.clone(),
        store.clone(),
        notifier.clone(),
    )
    .unwrap();
    (orchestrator, source, store, notifier)
}

#[tokio::test]
async fn decrease_produces_one_message_about_the_item() {
    let store = InMemorySnapshotStore::new().with_snapshot(snapshot("stock", &[("A", 10.0)]));
    let source = ScriptedSource::new().reply("stock", Reply::Snapshot(vec![("A", 7.0)]));
    let (orch, _, store, notifier) = harness(vec![spec("stock")], source, store, RecordingNotifier::new());

    let report = orch.run_stream(&spec("stock")).await.unwrap();

    assert_eq!(report.events, 1);
    assert_eq!(report.summary.quantity_changed, 1);
    assert_eq!(report.delivery, DeliveryOutcome::Delivered { messages: 1 });

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("• A: 10 pieces → 7 pieces (decreased by 3 pieces)"));
    assert_eq!(store.get(&sid("stock")).unwrap(), snapshot("stock", &[("A", 7.0)]));
}

#[tokio::test]
async fn new_item_is_reported_and_unchanged_item_is_not() {
    let store = InMemorySnapshotStore::new().with_snapshot(snapshot("stock", &[("A", 10.0)]));
    let source = ScriptedSource::new().reply("stock", Reply::Snapshot(vec![("A", 10.0), ("B", 5.0)]));
    let (orch, _, _, notifier) = harness(vec![spec("stock")], source, store, RecordingNotifier::new());

    let report = orch.run_stream(&spec("stock")).await.unwrap();

    assert_eq!(report.events, 1);
    assert_eq!(report.summary.added, 1);
    assert_eq!(report.summary.unchanged, 1);

    let text = &notifier.sent()[0].text;
    assert!(text.contains("*New Items:*\n• B: 5 pieces"));
    assert!(!text.contains("*Quantity Changes:*"));
}

#[tokio::test]
async fn missing_item_is_reported_as_removed() {
    let store = InMemorySnapshotStore::new().with_snapshot(snapshot("stock", &[("A", 10.0), ("B", 5.0)]));
    let source = ScriptedSource::new().reply("stock", Reply::Snapshot(vec![("A", 10.0)]));
    let (orch, _, _, notifier) = harness(vec![spec("stock")], source, store, RecordingNotifier::new());

    let report = orch.run_stream(&spec("stock")).await.unwrap();

    assert_eq!(report.events, 1);
    assert_eq!(report.summary.removed, 1);
    assert!(notifier.sent()[0].text.contains("*Removed Items:*\n• B (was 5 pieces)"));
}

#[tokio::test]
async fn cold_start_is_silent_but_saves_baseline() {
    let source = ScriptedSource::new().reply("stock", Reply::Snapshot(vec![("A", 10.0)]));
    let (orch, _, store, notifier) =
        harness(vec![spec("stock")], source, InMemorySnapshotStore::new(), RecordingNotifier::new());

    let report = orch.run_stream(&spec("stock")).await.unwrap();

    assert!(report.cold_start);
    assert_eq!(report.events, 0);
    assert_eq!(report.delivery, DeliveryOutcome::Skipped);
    assert!(notifier.sent().is_empty());
    assert_eq!(store.get(&sid("stock")).unwrap(), snapshot("stock", &[("A", 10.0)]));
}

#[tokio::test]
async fn second_identical_run_is_silent() {
    let source = ScriptedSource::new().reply("stock", Reply::Snapshot(vec![("A", 10.0)]));
    let (orch, _, store, notifier) =
        harness(vec![spec("stock")], source, InMemorySnapshotStore::new(), RecordingNotifier::new());

    orch.run_stream(&spec("stock")).await.unwrap();
    let report = orch.run_stream(&spec("stock")).await.unwrap();

    assert!(!report.cold_start);
    assert_eq!(report.delivery, DeliveryOutcome::Skipped);
    assert!(notifier.sent().is_empty());
    assert_eq!(store.save_count(), 2);
}

#[tokio::test]
async fn fetch_failure_leaves_state_untouched() {
    let store = InMemorySnapshotStore::new().with_snapshot(snapshot("stock", &[("A", 10.0)]));
    let source = ScriptedSource::new().reply("stock", Reply::Down);
    let (orch, _, store, notifier) = harness(vec![spec("stock")], source, store, RecordingNotifier::new());

    let err = orch.run_stream(&spec("stock")).await.unwrap_err();

    assert!(matches!(err, RunError::Fetch(FetchError::Network(_))));
    assert_eq!(store.save_count(), 0);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn delivery_failure_still_saves_and_is_ledgered() {
    let dir = std::env::temp_dir().join(format!("stockwatch-e2e-{}", RunId::new()));
    let ledger = FailedDeliveryLog::in_dir(&dir);

    let store = InMemorySnapshotStore::new().with_snapshot(snapshot("stock", &[("A", 10.0)]));
    let source = ScriptedSource::new().reply("stock", Reply::Snapshot(vec![("A", 4.0)]));
    let notifier = RecordingNotifier::failing(NotifierError::Rejected {
        status: 502,
        body: "bad gateway".into(),
    });
    let (orch, _, store, _) = harness(vec![spec("stock")], source, store, notifier);
    let orch = orch.with_ledger(ledger.clone());

    let report = orch.run_stream(&spec("stock")).await.unwrap();

    assert!(report.delivery_failed());
    assert!(matches!(report.delivery, DeliveryOutcome::Failed { sent: 0, .. }));
    assert_eq!(store.get(&sid("stock")).unwrap(), snapshot("stock", &[("A", 4.0)]));

    let failures = ledger.list().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].stream, sid("stock"));
    assert!(failures[0].error.contains("502"));
    assert_eq!(failures[0].payloads.len(), 1);
    assert!(failures[0].payloads[0].text.contains("• A: 10 pieces → 4 pieces (decreased by 6 pieces)"));
    assert!(render_summary(&failures).ends_with("Attempts: 1\n---"));

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn corrupt_state_rebaselines_without_alerting() {
    let source = Arc::new(ScriptedSource::new().reply("stock", Reply::Snapshot(vec![("A", 10.0)])));
    let notifier = Arc::new(RecordingNotifier::new());
    let store = Arc::new(CorruptStore(InMemorySnapshotStore::new()));
    let orch = Orchestrator::new(
        vec![spec("stock")],
        &PipelineConfig::default(),
        source,
        store.clone(),
        notifier.clone(),
    )
    .unwrap();

    let report = orch.run_stream(&spec("stock")).await.unwrap();

    assert!(report.cold_start);
    assert!(notifier.sent().is_empty());
    assert_eq!(store.0.save_count(), 1);
}

#[tokio::test]
async fn unreadable_state_aborts_the_run() {
    let source = ScriptedSource::new().reply("stock", Reply::Snapshot(vec![("A", 10.0)]));
    let notifier = Arc::new(RecordingNotifier::new());
    let orch = Orchestrator::new(
        vec![spec("stock")],
        &PipelineConfig::default(),
        source,
        UnreadableStore,
        notifier.clone(),
    )
    .unwrap();

    let err = orch.run_stream(&spec("stock")).await.unwrap_err();

    assert!(matches!(err, RunError::Store(StoreError::Io { .. })));
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn balance_comparison_is_attached_when_changes_are_reported() {
    let stock = with_balance_check(spec("stock"));
    let store = InMemorySnapshotStore::new().with_snapshot(snapshot("stock", &[("A", 10.0), ("Total", 10.0)]));
    let source = ScriptedSource::new()
        .reply("stock", Reply::Snapshot(vec![("A", 7.0), ("Total", 7.0)]))
        .with_balance(9.0);
    let (orch, _, _, notifier) = harness(vec![stock.clone()], source, store, RecordingNotifier::new());

    let report = orch.run_stream(&stock).await.unwrap();

    let balance = report.balance.unwrap();
    assert_eq!(balance.sheet_total, 7.0);
    assert_eq!(balance.records_total, 9.0);
    assert_eq!(balance.period, "2025-03");
    let text = &notifier.sent()[0].text;
    assert!(text.contains("*Stock Balance Comparison:*"));
    assert!(text.contains("⚠️ Stock balance discrepancy detected (2025-03):"));
}

#[tokio::test]
async fn balance_failure_only_drops_the_section() {
    let stock = with_balance_check(spec("stock"));
    let store = InMemorySnapshotStore::new().with_snapshot(snapshot("stock", &[("A", 10.0)]));
    let source = ScriptedSource::new().reply("stock", Reply::Snapshot(vec![("A", 7.0)]));
    let (orch, _, _, notifier) = harness(vec![stock.clone()], source, store, RecordingNotifier::new());

    let report = orch.run_stream(&stock).await.unwrap();

    assert!(report.balance.is_none());
    assert_eq!(report.delivery, DeliveryOutcome::Delivered { messages: 1 });
    assert!(!notifier.sent()[0].text.contains("Balance Comparison"));
}

#[tokio::test]
async fn streams_keep_separate_state() {
    let store = InMemorySnapshotStore::new()
        .with_snapshot(snapshot("stock", &[("A", 10.0)]))
        .with_snapshot(snapshot("parts", &[("Wings", 3.0)]));
    let source = ScriptedSource::new()
        .reply("stock", Reply::Snapshot(vec![("A", 10.0)]))
        .reply("parts", Reply::Snapshot(vec![("Wings", 5.0)]));
    let (orch, _, store, notifier) =
        harness(vec![spec("stock"), spec("parts")], source, store, RecordingNotifier::new());

    let results = orch.run_all().await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, sid("stock"));
    assert_eq!(results[0].1.as_ref().unwrap().delivery, DeliveryOutcome::Skipped);
    assert_eq!(
        results[1].1.as_ref().unwrap().delivery,
        DeliveryOutcome::Delivered { messages: 1 }
    );
    assert_eq!(notifier.sent().len(), 1);
    assert_eq!(store.get(&sid("parts")).unwrap(), snapshot("parts", &[("Wings", 5.0)]));
    assert_eq!(store.get(&sid("stock")).unwrap(), snapshot("stock", &[("A", 10.0)]));
}

#[tokio::test]
async fn watch_retries_fetch_and_stops_on_shutdown() {
    let source = ScriptedSource::new()
        .reply("stock", Reply::Down)
        .reply("stock", Reply::Snapshot(vec![("A", 10.0)]));
    let (orch, source, store, _) =
        harness(vec![spec("stock")], source, InMemorySnapshotStore::new(), RecordingNotifier::new());

    let cfg = WatchConfig {
        interval: Duration::from_secs(3600),
        max_retries: 2,
        base_backoff: Duration::from_millis(1),
    };
    let stats = watch(&orch, &cfg, tokio::time::sleep(Duration::from_millis(200))).await;

    assert_eq!(stats.ticks, 1);
    assert_eq!(stats.failed_runs, 0);
    assert_eq!(source.fetches(), 2);
    assert!(store.get(&sid("stock")).is_some());
}

fn temp_ledger() -> (std::path::PathBuf, FailedDeliveryLog) {
    let dir = std::env::temp_dir().join(format!("stockwatch-e2e-{}", RunId::new()));
    let ledger = FailedDeliveryLog::in_dir(&dir);
    (dir, ledger)
}

#[tokio::test]
async fn undelivered_alert_is_resent_once_the_webhook_recovers() {
    let (dir, ledger) = temp_ledger();
    let other = FailedDelivery::new(sid("parts"), "timeout", vec![MessagePayload { text: "parts".into() }]);
    ledger.record(&other).unwrap();

    let store = InMemorySnapshotStore::new().with_snapshot(snapshot("stock", &[("A", 10.0)]));
    let source = ScriptedSource::new().reply("stock", Reply::Snapshot(vec![("A", 4.0)]));
    let notifier = RecordingNotifier::failing(NotifierError::Rejected {
        status: 502,
        body: "bad gateway".into(),
    });
    let (orch, _, _, notifier) = harness(vec![spec("stock")], source, store, notifier);
    let orch = orch.with_ledger(ledger.clone());

    let first = orch.run_stream(&spec("stock")).await.unwrap();
    assert!(matches!(first.delivery, DeliveryOutcome::Failed { sent: 0, .. }));

    // Same sheet, webhook still down: no new diff, the old alert is retried.
    let second = orch.run_stream(&spec("stock")).await.unwrap();
    assert_eq!(second.delivery, DeliveryOutcome::Skipped);
    assert_eq!(second.redelivery, Redelivery { delivered: 0, pending: 1 });
    assert!(second.delivery_failed());
    let stock: Vec<_> = ledger.list().unwrap().into_iter().filter(|f| f.stream == sid("stock")).collect();
    assert_eq!(stock.len(), 1);
    assert_eq!(stock[0].attempts, 2);

    notifier.recover();
    let third = orch.run_stream(&spec("stock")).await.unwrap();
    assert_eq!(third.redelivery, Redelivery { delivered: 1, pending: 0 });
    assert!(!third.delivery_failed());

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("(decreased by 6 pieces)"));
    assert_eq!(ledger.list().unwrap(), vec![other]);

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn save_failure_is_fatal_after_notifying() {
    let store = Arc::new(FailingSaveStore(
        InMemorySnapshotStore::new().with_snapshot(snapshot("stock", &[("A", 10.0)])),
    ));
    let source = ScriptedSource::new().reply("stock", Reply::Snapshot(vec![("A", 7.0)]));
    let notifier = Arc::new(RecordingNotifier::new());
    let orch = Orchestrator::new(
        vec![spec("stock")],
        &PipelineConfig::default(),
        source,
        store.clone(),
        notifier.clone(),
    )
    .unwrap();

    let err = orch.run_stream(&spec("stock")).await.unwrap_err();

    assert!(matches!(err, RunError::Store(StoreError::Io { .. })));
    assert_eq!(notifier.sent().len(), 1);
    assert_eq!(store.0.get(&sid("stock")).unwrap(), snapshot("stock", &[("A", 10.0)]));
}

#[tokio::test]
async fn failure_midway_through_a_split_message_ledgers_only_the_rest() {
    let (dir, ledger) = temp_ledger();
    let wide = |qty: f64| {
        Snapshot::new(
            sid("stock"),
            Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap(),
            (0..40).map(|i| Item::new(ItemKey::new(format!("item-{i:02}")).unwrap(), Quantity::new(qty).unwrap())),
        )
        .unwrap()
    };

    let mut config = PipelineConfig::default();
    config.formatter.max_payload_bytes = 600;
    let notifier = Arc::new(RecordingNotifier::failing_after(
        2,
        NotifierError::Transport("connection reset".into()),
    ));
    let orch = Orchestrator::new(
        vec![spec("stock")],
        &config,
        ScriptedSource::new().reply("stock", Reply::Ready(wide(50.0))),
        InMemorySnapshotStore::new().with_snapshot(wide(100.0)),
        notifier.clone(),
    )
    .unwrap()
    .with_ledger(ledger.clone());

    let report = orch.run_stream(&spec("stock")).await.unwrap();

    assert!(matches!(report.delivery, DeliveryOutcome::Failed { sent: 2, .. }));
    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    let failures = ledger.list().unwrap();
    assert_eq!(failures.len(), 1);
    let rest = &failures[0].payloads;
    assert!(!rest.is_empty());
    assert!(rest[0].text.contains("(3/"));
    assert!(rest.iter().all(|p| !sent.contains(p)));
    assert!(rest.last().unwrap().text.contains("_Updated at:"));

    notifier.recover();
    let next = orch.run_stream(&spec("stock")).await.unwrap();
    assert_eq!(next.redelivery.delivered, rest.len());
    let total = notifier.sent().len();
    assert!(notifier.sent()[total - 1].text.contains(&format!("({total}/{total})")));
    assert!(ledger.list().unwrap().is_empty());

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn unreadable_cell_keeps_its_previous_value() {
    let store = InMemorySnapshotStore::new().with_snapshot(snapshot("stock", &[("A", 10.0), ("B", 5.0)]));
    let source = ScriptedSource::new().reply("stock", Reply::Partial(vec![("A", 10.0)], vec!["B"]));
    let (orch, _, store, notifier) = harness(vec![spec("stock")], source, store, RecordingNotifier::new());

    let report = orch.run_stream(&spec("stock")).await.unwrap();

    assert_eq!(report.carried_over, 1);
    assert_eq!(report.summary.removed, 0);
    assert_eq!(report.delivery, DeliveryOutcome::Skipped);
    assert!(notifier.sent().is_empty());
    assert_eq!(store.get(&sid("stock")).unwrap(), snapshot("stock", &[("A", 10.0), ("B", 5.0)]));
}

#[tokio::test]
async fn shutdown_interrupts_retry_backoff() {
    let source = ScriptedSource::new().reply("stock", Reply::Down);
    let (orch, source, store, _) =
        harness(vec![spec("stock")], source, InMemorySnapshotStore::new(), RecordingNotifier::new());

    let cfg = WatchConfig {
        interval: Duration::from_secs(3600),
        max_retries: 3,
        base_backoff: Duration::from_secs(60),
    };
    let stats = tokio::time::timeout(
        Duration::from_secs(5),
        watch(&orch, &cfg, tokio::time::sleep(Duration::from_millis(100))),
    )
    .await
    .unwrap();

    assert_eq!(stats.ticks, 1);
    assert_eq!(source.fetches(), 1);
    assert_eq!(store.save_count(), 0);
}

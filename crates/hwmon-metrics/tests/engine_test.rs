use async_trait::async_trait;
use hwmon_core::{EventBus, MONITOR_TOPIC};
use hwmon_metrics::{
    AlertStateTracker, CollectError, Collector, HistoryBuffer, MonitorLoop, MonitorMetrics,
    MonitorSettings, NotificationDispatcher, ThresholdClassifier,
};
use hwmon_notify::{Notifier, NotifyChannel, NotifyManager, NotifyMessage, NotifyResult};
use hwmon_storage::{AlertStore, MemoryAlertStore, StoreError};
use hwmon_types::{Alert, Status, ThresholdSpec};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 值可以在周期之间修改的采集器
#[derive(Clone, Default)]
struct MockCollector {
    values: Arc<Mutex<HashMap<String, f64>>>,
}

impl MockCollector {
    fn set(&self, metric: &str, value: f64) {
        self.values.lock().unwrap().insert(metric.to_string(), value);
    }
}

#[async_trait]
impl Collector for MockCollector {
    async fn sample(&mut self, metric_id: &str) -> Result<f64, CollectError> {
        self.values
            .lock()
            .unwrap()
            .get(metric_id)
            .copied()
            .ok_or_else(|| CollectError::Unavailable(metric_id.to_string()))
    }
}

struct RecordingNotifier {
    sent: Arc<Mutex<Vec<NotifyMessage>>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &NotifyMessage) -> anyhow::Result<NotifyResult> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(NotifyResult::success())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct BrokenStore {
    attempts: AtomicUsize,
}

#[async_trait]
impl AlertStore for BrokenStore {
    async fn record(&self, _alert: &Alert) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("read-only filesystem".to_string()))
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<Alert>, StoreError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "broken"
    }
}

struct Harness {
    collector: MockCollector,
    bus: Arc<EventBus>,
    pushed: Arc<Mutex<Vec<NotifyMessage>>>,
    metrics: Arc<MonitorMetrics>,
    monitor: MonitorLoop,
}

async fn harness(store: Arc<dyn AlertStore>, notify_recovery: bool) -> Harness {
    let collector = MockCollector::default();
    let bus = Arc::new(EventBus::new(64));
    let pushed = Arc::new(Mutex::new(Vec::new()));
    let metrics = Arc::new(MonitorMetrics::new().unwrap());

    let manager = NotifyManager::default();
    manager
        .register(
            NotifyChannel::Pushbullet,
            Box::new(RecordingNotifier {
                sent: pushed.clone(),
            }),
        )
        .await;

    let dispatcher = NotificationDispatcher::new(store, bus.clone())
        .with_push(Arc::new(manager))
        .with_timeout(Duration::from_millis(500))
        .with_metrics(metrics.clone());

    let monitor = MonitorLoop::new(
        Box::new(collector.clone()),
        ThresholdClassifier::from_specs(vec![
            ThresholdSpec::above("cpu", 80.0, 90.0),
            ThresholdSpec::below("battery", 20.0, 10.0),
        ]),
        AlertStateTracker::default(),
        HistoryBuffer::new(100),
        Arc::new(dispatcher),
        bus.clone(),
        MonitorSettings {
            interval: Duration::from_millis(10),
            metrics: vec!["cpu".to_string(), "battery".to_string()],
            notify_recovery,
        },
    )
    .with_metrics(metrics.clone());

    Harness {
        collector,
        bus,
        pushed,
        metrics,
        monitor,
    }
}

#[tokio::test]
async fn test_critical_cpu_reaches_all_sinks() {
    let store = Arc::new(MemoryAlertStore::default());
    let mut h = harness(store.clone(), false).await;
    let mut rx = h.bus.subscribe();
    h.collector.set("cpu", 95.0);
    h.collector.set("battery", 80.0);

    h.monitor.run_cycle().await.unwrap();

    let alerts = store.recent(5).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].status, Status::Critical);
    assert_eq!(alerts[0].message, "Critical: High cpu: 95.0");
    assert_eq!(alerts[0].notification_count, 1);

    let pushed = h.pushed.lock().unwrap().clone();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].title, "Hardware Monitor Critical Alert");
    assert_eq!(pushed[0].body, "Critical: High cpu: 95.0");

    // 先收到告警，再收到快照
    let alert_event = rx.recv().await.unwrap();
    assert_eq!(alert_event.topic, MONITOR_TOPIC);
    assert_eq!(alert_event.payload["message"], "Critical: High cpu: 95.0");
    assert_eq!(alert_event.payload["status"], "critical");

    let snapshot_event = rx.recv().await.unwrap();
    assert_eq!(snapshot_event.payload["data"]["metrics"]["cpu"]["value"], 95.0);
}

#[tokio::test]
async fn test_low_battery_is_critical() {
    let store = Arc::new(MemoryAlertStore::default());
    let mut h = harness(store.clone(), false).await;
    h.collector.set("cpu", 10.0);
    h.collector.set("battery", 8.0);

    let snapshot = h.monitor.run_cycle().await.unwrap();
    assert_eq!(
        snapshot.metrics["battery"].message.as_deref(),
        Some("Critical: Low battery: 8.0%")
    );

    let alerts = store.recent(5).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].metric_id, "battery");
}

#[tokio::test]
async fn test_escalation_then_debounce() {
    let store = Arc::new(MemoryAlertStore::default());
    let mut h = harness(store.clone(), false).await;
    h.collector.set("battery", 80.0);

    h.collector.set("cpu", 85.0);
    h.monitor.run_cycle().await.unwrap();
    h.collector.set("cpu", 95.0);
    h.monitor.run_cycle().await.unwrap();
    h.monitor.run_cycle().await.unwrap();

    let alerts = store.recent(10).await.unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].status, Status::Critical);
    assert_eq!(alerts[1].status, Status::Warning);

    // 只有 critical 会推送
    assert_eq!(h.pushed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_store_failure_does_not_block_push_or_broadcast() {
    let store = Arc::new(BrokenStore {
        attempts: AtomicUsize::new(0),
    });
    let mut h = harness(store.clone(), false).await;
    let mut rx = h.bus.subscribe();
    h.collector.set("cpu", 99.0);

    h.monitor.run_cycle().await.unwrap();

    assert_eq!(store.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(h.pushed.lock().unwrap().len(), 1);
    assert_eq!(rx.recv().await.unwrap().payload["status"], "critical");
    assert_eq!(h.metrics.sink_failures("store"), 1.0);
}

#[tokio::test]
async fn test_recovery_notice_is_stored_but_not_pushed() {
    let store = Arc::new(MemoryAlertStore::default());
    let mut h = harness(store.clone(), true).await;
    h.collector.set("battery", 80.0);

    h.collector.set("cpu", 95.0);
    h.monitor.run_cycle().await.unwrap();
    h.collector.set("cpu", 40.0);
    h.monitor.run_cycle().await.unwrap();

    let alerts = store.recent(10).await.unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].status, Status::Ok);
    assert_eq!(alerts[0].message, "Recovered: cpu: 40.0");
    assert_eq!(h.pushed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_metric_is_skipped_without_alert() {
    let store = Arc::new(MemoryAlertStore::default());
    let mut h = harness(store.clone(), false).await;
    h.collector.set("cpu", 50.0);

    let snapshot = h.monitor.run_cycle().await.unwrap();
    assert!(snapshot.metrics.get("battery").is_none());
    assert!(store.recent(10).await.unwrap().is_empty());
    assert!(h.metrics.export().unwrap().contains("hwmon_sample_failures_total{metric=\"battery\"} 1"));
}

use crate::metrics::MonitorMetrics;
use hwmon_core::{Broadcaster, MonitorError, MONITOR_TOPIC};
use hwmon_notify::{NotifyManager, NotifyMessage};
use hwmon_storage::AlertStore;
use hwmon_types::Alert;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const STORE_SINK: &str = "store";
pub const PUSH_SINK: &str = "push";
pub const BROADCAST_SINK: &str = "broadcast";

/// 推送通知的默认标题
pub const DEFAULT_PUSH_TITLE: &str = "Hardware Monitor Critical Alert";

/// 每个 sink 调用的默认超时
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_millis(3000);

/// 单个 sink 的投递结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum SinkOutcome {
    Delivered,
    Skipped,
    Failed(String),
    TimedOut,
}

impl SinkOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SinkOutcome::Failed(_) | SinkOutcome::TimedOut)
    }
}

/// 一次分发的汇总结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub store: SinkOutcome,
    pub push: SinkOutcome,
    pub broadcast: SinkOutcome,
}

impl DispatchReport {
    pub fn failures(&self) -> Vec<(&'static str, &SinkOutcome)> {
        [
            (STORE_SINK, &self.store),
            (PUSH_SINK, &self.push),
            (BROADCAST_SINK, &self.broadcast),
        ]
        .into_iter()
        .filter(|(_, outcome)| outcome.is_failure())
        .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failures().is_empty()
    }
}

/// 告警分发器
///
/// 三个 sink 并发执行，各自带超时；任何一个失败或超时都不影响其余两个，也不向调用方返回错误。
pub struct NotificationDispatcher {
    store: Arc<dyn AlertStore>,
    push: Option<Arc<NotifyManager>>,
    broadcaster: Arc<dyn Broadcaster>,
    topic: String,
    push_title: String,
    timeout: Duration,
    metrics: Option<Arc<MonitorMetrics>>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn AlertStore>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            store,
            push: None,
            broadcaster,
            topic: MONITOR_TOPIC.to_string(),
            push_title: DEFAULT_PUSH_TITLE.to_string(),
            timeout: DEFAULT_SINK_TIMEOUT,
            metrics: None,
        }
    }

    pub fn with_push(mut self, manager: Arc<NotifyManager>) -> Self {
        self.push = Some(manager);
        self
    }

    pub fn with_push_title(mut self, title: impl Into<String>) -> Self {
        self.push_title = title.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MonitorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &Arc<dyn AlertStore> {
        &self.store
    }

    pub async fn dispatch(&self, alert: &Alert) -> DispatchReport {
        let (store, push, broadcast) = tokio::join!(
            self.guarded(STORE_SINK, alert, self.persist(alert)),
            self.guarded(PUSH_SINK, alert, self.push(alert)),
            self.guarded(BROADCAST_SINK, alert, self.publish(alert)),
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_alert(&alert.metric_id, alert.status.as_str());
        }

        info!(
            metric = %alert.metric_id,
            status = ?alert.status,
            count = alert.notification_count,
            "Alert dispatched: {}",
            alert.message
        );

        DispatchReport {
            store,
            push,
            broadcast,
        }
    }

    async fn guarded<F>(&self, sink: &'static str, alert: &Alert, fut: F) -> SinkOutcome
    where
        F: Future<Output = Result<SinkOutcome, MonitorError>>,
    {
        let outcome = match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(sink, metric = %alert.metric_id, error = %e, "Sink failed");
                SinkOutcome::Failed(e.to_string())
            }
            Err(_) => {
                let e = MonitorError::Timeout {
                    sink: sink.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                };
                warn!(sink, metric = %alert.metric_id, error = %e, "Sink failed");
                SinkOutcome::TimedOut
            }
        };

        if outcome.is_failure() {
            if let Some(metrics) = &self.metrics {
                metrics.record_sink_failure(sink);
            }
        }

        outcome
    }

    async fn persist(&self, alert: &Alert) -> Result<SinkOutcome, MonitorError> {
        self.store
            .record(alert)
            .await
            .map_err(|e| MonitorError::sink(self.store.name(), e))?;
        Ok(SinkOutcome::Delivered)
    }

    async fn push(&self, alert: &Alert) -> Result<SinkOutcome, MonitorError> {
        let manager = match &self.push {
            Some(manager) if alert.is_critical() => manager,
            _ => return Ok(SinkOutcome::Skipped),
        };

        let message = NotifyMessage::critical(self.push_title.clone(), alert.message.clone())
            .with_metadata(serde_json::json!({
                "metric_id": alert.metric_id,
                "status": alert.status,
                "notification_count": alert.notification_count,
            }));

        match manager.broadcast(&message).await {
            Ok(0) => {
                debug!(metric = %alert.metric_id, "No push channel configured");
                Ok(SinkOutcome::Skipped)
            }
            Ok(_) => Ok(SinkOutcome::Delivered),
            Err(e) => Err(MonitorError::sink(PUSH_SINK, e)),
        }
    }

    async fn publish(&self, alert: &Alert) -> Result<SinkOutcome, MonitorError> {
        let receivers = self
            .broadcaster
            .publish(&self.topic, alert.broadcast_payload())?;
        debug!(metric = %alert.metric_id, receivers, "Alert broadcast");
        Ok(SinkOutcome::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use hwmon_core::EventBus;
    use hwmon_notify::{Notifier, NotifyChannel, NotifyResult};
    use hwmon_storage::{MemoryAlertStore, StoreError};
    use hwmon_types::Status;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingStore;

    #[async_trait]
    impl AlertStore for FailingStore {
        async fn record(&self, _alert: &Alert) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk full".to_string()))
        }

        async fn recent(&self, _limit: usize) -> Result<Vec<Alert>, StoreError> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct HangingStore;

    #[async_trait]
    impl AlertStore for HangingStore {
        async fn record(&self, _alert: &Alert) -> Result<(), StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }

        async fn recent(&self, _limit: usize) -> Result<Vec<Alert>, StoreError> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "hanging"
        }
    }

    struct CountingNotifier {
        sent: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn send(&self, _message: &NotifyMessage) -> anyhow::Result<NotifyResult> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(NotifyResult::success())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    async fn push_manager(sent: Arc<AtomicUsize>) -> Arc<NotifyManager> {
        let manager = NotifyManager::default();
        manager
            .register(NotifyChannel::Pushbullet, Box::new(CountingNotifier { sent }))
            .await;
        Arc::new(manager)
    }

    fn alert(status: Status) -> Alert {
        Alert::new("cpu", status, format!("{}: High cpu: 95.0", status.label()), Utc::now(), 1)
    }

    #[tokio::test]
    async fn test_critical_reaches_all_sinks() {
        let store = Arc::new(MemoryAlertStore::default());
        let bus = Arc::new(EventBus::new(16));
        let mut rx = bus.subscribe();
        let sent = Arc::new(AtomicUsize::new(0));

        let dispatcher = NotificationDispatcher::new(store.clone(), bus.clone())
            .with_push(push_manager(sent.clone()).await);

        let report = dispatcher.dispatch(&alert(Status::Critical)).await;
        assert_eq!(report.store, SinkOutcome::Delivered);
        assert_eq!(report.push, SinkOutcome::Delivered);
        assert_eq!(report.broadcast, SinkOutcome::Delivered);

        assert_eq!(store.len().await, 1);
        assert_eq!(sent.load(Ordering::SeqCst), 1);

        let message = rx.recv().await.unwrap();
        assert_eq!(message.topic, MONITOR_TOPIC);
        assert_eq!(message.payload["status"], "critical");
    }

    #[tokio::test]
    async fn test_warning_is_not_pushed() {
        let sent = Arc::new(AtomicUsize::new(0));
        let dispatcher = NotificationDispatcher::new(
            Arc::new(MemoryAlertStore::default()),
            Arc::new(EventBus::new(16)),
        )
        .with_push(push_manager(sent.clone()).await);

        let report = dispatcher.dispatch(&alert(Status::Warning)).await;
        assert_eq!(report.push, SinkOutcome::Skipped);
        assert_eq!(sent.load(Ordering::SeqCst), 0);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_store_failure_does_not_block_other_sinks() {
        let bus = Arc::new(EventBus::new(16));
        let mut rx = bus.subscribe();
        let sent = Arc::new(AtomicUsize::new(0));
        let metrics = Arc::new(MonitorMetrics::new().unwrap());

        let dispatcher = NotificationDispatcher::new(Arc::new(FailingStore), bus.clone())
            .with_push(push_manager(sent.clone()).await)
            .with_metrics(metrics.clone());

        let report = dispatcher.dispatch(&alert(Status::Critical)).await;
        assert!(matches!(report.store, SinkOutcome::Failed(_)));
        assert_eq!(report.push, SinkOutcome::Delivered);
        assert_eq!(report.broadcast, SinkOutcome::Delivered);
        assert_eq!(report.failures().len(), 1);

        assert_eq!(sent.load(Ordering::SeqCst), 1);
        assert!(rx.recv().await.is_ok());
        assert_eq!(metrics.sink_failures(STORE_SINK), 1.0);
    }

    #[tokio::test]
    async fn test_hanging_sink_times_out() {
        let bus = Arc::new(EventBus::new(16));
        let mut rx = bus.subscribe();

        let dispatcher = NotificationDispatcher::new(Arc::new(HangingStore), bus.clone())
            .with_timeout(Duration::from_millis(50));

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            dispatcher.dispatch(&alert(Status::Critical)),
        )
        .await
        .unwrap();

        assert_eq!(report.store, SinkOutcome::TimedOut);
        assert_eq!(report.push, SinkOutcome::Skipped);
        assert_eq!(report.broadcast, SinkOutcome::Delivered);
        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers_is_delivered() {
        let dispatcher = NotificationDispatcher::new(
            Arc::new(MemoryAlertStore::default()),
            Arc::new(EventBus::new(16)),
        );

        let report = dispatcher.dispatch(&alert(Status::Warning)).await;
        assert_eq!(report.broadcast, SinkOutcome::Delivered);
    }
}

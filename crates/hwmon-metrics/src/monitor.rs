use crate::classifier::{recovery_message, ThresholdClassifier};
use crate::collector::{
    Collector, METRIC_BATTERY, METRIC_CPU, METRIC_DISK, METRIC_DISK_READ_SPEED,
    METRIC_DISK_WRITE_SPEED, METRIC_NETWORK, METRIC_NETWORK_SPEED, METRIC_RAM, METRIC_TEMPERATURE,
};
use crate::dispatcher::{DispatchReport, NotificationDispatcher};
use crate::history::HistoryBuffer;
use crate::metrics::MonitorMetrics;
use crate::snapshot::{MetricReading, Snapshot};
use crate::tracker::AlertStateTracker;
use chrono::Utc;
use hwmon_core::{Broadcaster, MonitorError, Result, MONITOR_TOPIC};
use hwmon_types::{Alert, MetricSample, Status};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 最近一次快照，供查询接口读取
pub type SharedSnapshot = Arc<RwLock<Option<Snapshot>>>;

pub fn default_metrics() -> Vec<String> {
    [
        METRIC_CPU,
        METRIC_RAM,
        METRIC_DISK,
        METRIC_TEMPERATURE,
        METRIC_NETWORK,
        METRIC_BATTERY,
        METRIC_NETWORK_SPEED,
        METRIC_DISK_READ_SPEED,
        METRIC_DISK_WRITE_SPEED,
    ]
    .iter()
    .map(|m| m.to_string())
    .collect()
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// 两个周期之间的休眠时间，从上一周期结束开始计算
    pub interval: Duration,
    /// 按顺序采集的指标
    pub metrics: Vec<String>,
    /// 指标从 warning/critical 回到 ok 时是否发送恢复通知
    pub notify_recovery: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            metrics: default_metrics(),
            notify_recovery: false,
        }
    }
}

pub struct MonitorTaskHandle {
    shutdown_tx: watch::Sender<bool>,
    join_handle: JoinHandle<()>,
}

impl MonitorTaskHandle {
    /// 停止启动新周期，并等待进行中的周期结束
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.join_handle.await;
    }

    pub fn abort(self) {
        self.join_handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }
}

/// 采集 → 分级 → 写历史 → 去抖 → 分发 → 广播快照 的监控循环
pub struct MonitorLoop {
    collector: Box<dyn Collector>,
    classifier: ThresholdClassifier,
    tracker: AlertStateTracker,
    history: HistoryBuffer,
    dispatcher: Arc<NotificationDispatcher>,
    broadcaster: Arc<dyn Broadcaster>,
    topic: String,
    latest: SharedSnapshot,
    metrics: Option<Arc<MonitorMetrics>>,
    settings: MonitorSettings,
}

impl MonitorLoop {
    pub fn new(
        collector: Box<dyn Collector>,
        classifier: ThresholdClassifier,
        tracker: AlertStateTracker,
        history: HistoryBuffer,
        dispatcher: Arc<NotificationDispatcher>,
        broadcaster: Arc<dyn Broadcaster>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            collector,
            classifier,
            tracker,
            history,
            dispatcher,
            broadcaster,
            topic: MONITOR_TOPIC.to_string(),
            latest: Arc::new(RwLock::new(None)),
            metrics: None,
            settings,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MonitorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn latest_snapshot(&self) -> SharedSnapshot {
        self.latest.clone()
    }

    pub fn tracker(&self) -> &AlertStateTracker {
        &self.tracker
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// 执行一个完整周期
    ///
    /// 单个指标采集失败只跳过该指标；sink 失败记录在分发结果里，不会让周期失败。
    pub async fn run_cycle(&mut self) -> Result<Snapshot> {
        let now = Utc::now();

        self.collector
            .refresh()
            .await
            .map_err(|e| MonitorError::Collection(e.to_string()))?;

        let samples = self.collect(now).await;
        let mut snapshot = Snapshot::new(now, self.collector.system_info());
        let mut classified = Vec::new();

        for (sample, details) in &samples {
            self.history.append(sample).await;

            let mut reading = MetricReading::new(sample.value).with_details(details.clone());
            if let Some((status, message)) = self.classifier.classify(&sample.metric_id, sample.value) {
                classified.push((sample, status, message.clone()));
                reading = reading.with_status(status, message);
            }

            snapshot.insert(sample.metric_id.clone(), reading);
        }

        for (sample, status, message) in classified {
            self.evaluate_and_dispatch(sample, status, message).await;
        }

        self.publish_snapshot(&snapshot)?;
        *self.latest.write().await = Some(snapshot.clone());

        Ok(snapshot)
    }

    async fn collect(
        &mut self,
        now: chrono::DateTime<Utc>,
    ) -> Vec<(MetricSample, Option<serde_json::Value>)> {
        let mut samples = Vec::with_capacity(self.settings.metrics.len());

        for metric_id in &self.settings.metrics {
            match self.collector.sample(metric_id).await {
                Ok(value) if value.is_finite() => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_sample(metric_id, value);
                    }
                    let details = self.collector.details(metric_id);
                    samples.push((MetricSample::at(metric_id.as_str(), value, now), details));
                }
                Ok(value) => {
                    warn!(metric = %metric_id, value, "Skipping non-finite sample");
                    if let Some(metrics) = &self.metrics {
                        metrics.record_sample_failure(metric_id);
                    }
                }
                Err(e) => {
                    warn!(metric = %metric_id, error = %e, "Skipping metric this cycle");
                    if let Some(metrics) = &self.metrics {
                        metrics.record_sample_failure(metric_id);
                    }
                }
            }
        }

        samples
    }

    async fn evaluate_and_dispatch(
        &self,
        sample: &MetricSample,
        status: Status,
        message: Option<String>,
    ) -> Option<DispatchReport> {
        let metric_id = sample.metric_id.as_str();
        let previous = self.tracker.status_of(metric_id).await;

        if !self.tracker.evaluate(metric_id, status, sample.timestamp).await {
            return None;
        }

        let alert = match message {
            Some(message) => {
                let count = self
                    .tracker
                    .state(metric_id)
                    .await
                    .map(|state| state.notification_count)
                    .unwrap_or(1);
                Alert::new(metric_id, status, message, sample.timestamp, count)
            }
            None if self.settings.notify_recovery && !previous.is_ok() => {
                info!(metric = %metric_id, from = ?previous, "Metric recovered");
                Alert::new(
                    metric_id,
                    Status::Ok,
                    recovery_message(metric_id, sample.value),
                    sample.timestamp,
                    1,
                )
            }
            None => return None,
        };

        let report = self.dispatcher.dispatch(&alert).await;
        for (sink, outcome) in report.failures() {
            debug!(metric = %metric_id, sink, outcome = ?outcome, "Sink did not deliver");
        }
        Some(report)
    }

    fn publish_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let payload = snapshot.broadcast_payload()?;
        if let Err(e) = self.broadcaster.publish(&self.topic, payload) {
            warn!(error = %e, "Snapshot broadcast failed");
        }
        Ok(())
    }

    /// 在后台任务中运行监控循环
    pub fn spawn(mut self) -> MonitorTaskHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let join_handle = tokio::spawn(async move {
            info!(
                interval_secs = self.settings.interval.as_secs_f64(),
                metrics = ?self.settings.metrics,
                "Monitor loop started"
            );

            loop {
                if *shutdown_rx.borrow() {
                    break;
                }

                let started = Instant::now();
                match self.run_cycle().await {
                    Ok(snapshot) => {
                        debug!(worst = ?snapshot.worst_status(), "Monitor cycle completed");
                    }
                    Err(e) => {
                        error!("Monitor cycle failed: {}", e);
                        if let Some(metrics) = &self.metrics {
                            metrics.record_cycle_error();
                        }
                    }
                }
                if let Some(metrics) = &self.metrics {
                    metrics.record_cycle(started.elapsed().as_secs_f64());
                }

                tokio::select! {
                    _ = tokio::time::sleep(self.settings.interval) => {}
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Monitor loop stopped");
        });

        MonitorTaskHandle {
            shutdown_tx,
            join_handle,
        }
    }
}

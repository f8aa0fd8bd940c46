use crate::AppState;
use anyhow::{Context, Result};
use hwmon_config::{AppConfig, NotifyConfig, StorageConfig};
use hwmon_core::EventBus;
use hwmon_metrics::{
    AlertStateTracker, Collector, HistoryBuffer, MonitorLoop, MonitorMetrics, MonitorSettings,
    NotificationDispatcher, SystemCollector, ThresholdClassifier,
};
use hwmon_notify::providers::{PushbulletConfig, SlackConfig, WebhookConfig};
use hwmon_notify::{
    NotifyChannel, NotifyLevel, NotifyManager, PushbulletNotifier, SlackNotifier, WebhookNotifier,
};
use hwmon_storage::{AlertStore, FileAlertStore, MemoryAlertStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const EVENT_BUS_CAPACITY: usize = 256;

/// 告警日志：配置了路径用 JSONL 文件，否则用内存
pub fn build_store(config: &StorageConfig) -> Arc<dyn AlertStore> {
    match &config.alert_log {
        Some(path) => {
            info!("Alert log: {}", path.display());
            Arc::new(FileAlertStore::new(path))
        }
        None => {
            warn!("No alert log configured, alerts are kept in memory only");
            Arc::new(MemoryAlertStore::new(config.recent_capacity))
        }
    }
}

/// 按配置注册推送渠道；只推送 critical
pub async fn build_notify_manager(config: &NotifyConfig) -> Arc<NotifyManager> {
    let manager = NotifyManager::new(NotifyLevel::Critical);

    if let Some(token) = config.pushbullet_token.as_ref().filter(|t| !t.is_empty()) {
        manager
            .register(
                NotifyChannel::Pushbullet,
                Box::new(PushbulletNotifier::new(PushbulletConfig::new(token.clone()))),
            )
            .await;
    }

    if let Some(url) = config.webhook_url.as_ref().filter(|u| !u.is_empty()) {
        manager
            .register(
                NotifyChannel::Webhook,
                Box::new(WebhookNotifier::new(WebhookConfig::new(url.clone()))),
            )
            .await;
    }

    if let Some(url) = config.slack_webhook.as_ref().filter(|u| !u.is_empty()) {
        manager
            .register(
                NotifyChannel::Slack,
                Box::new(SlackNotifier::new(SlackConfig {
                    webhook_url: url.clone(),
                })),
            )
            .await;
    }

    if manager.notifier_count().await == 0 {
        warn!("No push channel configured, critical alerts will only be logged and broadcast");
    }

    Arc::new(manager)
}

/// 用默认的系统采集器组装监控循环
pub async fn build(config: &AppConfig) -> Result<(Arc<AppState>, MonitorLoop)> {
    let collector = SystemCollector::new(
        config.monitor.disk_path.clone(),
        config.monitor.latency_target.clone(),
    );
    build_with_collector(config, Box::new(collector)).await
}

pub async fn build_with_collector(
    config: &AppConfig,
    collector: Box<dyn Collector>,
) -> Result<(Arc<AppState>, MonitorLoop)> {
    let metrics = Arc::new(MonitorMetrics::new().context("Failed to register self-metrics")?);
    let event_bus = Arc::new(EventBus::new(EVENT_BUS_CAPACITY));
    let store = build_store(&config.storage);
    let notify_manager = build_notify_manager(&config.notify).await;

    let dispatcher = NotificationDispatcher::new(store.clone(), event_bus.clone())
        .with_push(notify_manager)
        .with_push_title(config.notify.push_title.clone())
        .with_timeout(Duration::from_millis(config.monitor.sink_timeout_ms))
        .with_metrics(metrics.clone());

    let tracker = AlertStateTracker::new(config.cooldown);
    let history = HistoryBuffer::new(config.monitor.history_capacity);
    let classifier = ThresholdClassifier::new(config.threshold_specs());
    info!("Loaded {} threshold rules", classifier.rule_count());

    let monitor = MonitorLoop::new(
        collector,
        classifier,
        tracker.clone(),
        history.clone(),
        Arc::new(dispatcher),
        event_bus.clone(),
        MonitorSettings {
            interval: Duration::from_secs(config.monitor.interval_secs),
            metrics: config.monitor.metrics.clone(),
            notify_recovery: config.monitor.notify_recovery,
        },
    )
    .with_metrics(metrics.clone());

    let state = Arc::new(AppState {
        event_bus,
        store,
        tracker,
        history,
        snapshot: monitor.latest_snapshot(),
        metrics,
    });

    Ok((state, monitor))
}

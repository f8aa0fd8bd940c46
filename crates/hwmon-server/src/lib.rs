pub mod api;
pub mod app;

use hwmon_core::EventBus;
use hwmon_metrics::{AlertStateTracker, HistoryBuffer, MonitorMetrics, SharedSnapshot};
use hwmon_storage::AlertStore;
use std::sync::Arc;

/// 查询接口共享的只读状态；写入方只有监控循环
pub struct AppState {
    pub event_bus: Arc<EventBus>,
    pub store: Arc<dyn AlertStore>,
    pub tracker: AlertStateTracker,
    pub history: HistoryBuffer,
    pub snapshot: SharedSnapshot,
    pub metrics: Arc<MonitorMetrics>,
}

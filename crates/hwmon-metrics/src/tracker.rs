use chrono::{DateTime, Utc};
use hwmon_types::{CooldownConfig, Status};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// 单个指标的去抖状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    pub current_status: Status,
    pub last_notification_time: Option<DateTime<Utc>>,
    pub notification_count: u32,
}

impl Default for AlertState {
    fn default() -> Self {
        Self {
            current_status: Status::Ok,
            last_notification_time: None,
            notification_count: 0,
        }
    }
}

/// 告警状态跟踪器
///
/// 状态变化或首次评估立即放行；同一状态持续时，只有距上次通知超过该级别的冷却时间才再次放行。
/// ok 没有冷却时间，持续 ok 永远不会放行。
#[derive(Clone)]
pub struct AlertStateTracker {
    states: Arc<RwLock<HashMap<String, AlertState>>>,
    cooldown: CooldownConfig,
}

impl AlertStateTracker {
    pub fn new(cooldown: CooldownConfig) -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
            cooldown,
        }
    }

    pub fn cooldown(&self) -> &CooldownConfig {
        &self.cooldown
    }

    /// 判断本次分级结果是否需要通知，并始终把 `current_status` 更新为 `status`
    pub async fn evaluate(&self, metric_id: &str, status: Status, now: DateTime<Utc>) -> bool {
        let mut states = self.states.write().await;
        let state = states.entry(metric_id.to_string()).or_default();

        let sustained = state
            .last_notification_time
            .filter(|_| state.current_status == status);

        let last = match sustained {
            Some(last) => last,
            None => {
                if state.last_notification_time.is_some() {
                    info!(
                        metric = %metric_id,
                        from = ?state.current_status,
                        to = ?status,
                        "Status transition"
                    );
                }
                state.current_status = status;
                state.last_notification_time = Some(now);
                state.notification_count = 1;
                return true;
            }
        };

        let cooldown_elapsed = self
            .cooldown
            .for_status(status)
            .map(|cooldown| now - last >= cooldown)
            .unwrap_or(false);

        if cooldown_elapsed {
            state.last_notification_time = Some(now);
            state.notification_count += 1;
            true
        } else {
            debug!(metric = %metric_id, status = ?status, "Notification debounced");
            false
        }
    }

    /// 上一次评估的状态；从未评估过的指标视为 ok
    pub async fn status_of(&self, metric_id: &str) -> Status {
        self.states
            .read()
            .await
            .get(metric_id)
            .map(|state| state.current_status)
            .unwrap_or_default()
    }

    pub async fn state(&self, metric_id: &str) -> Option<AlertState> {
        self.states.read().await.get(metric_id).cloned()
    }

    /// 所有指标的状态快照
    pub async fn states(&self) -> HashMap<String, AlertState> {
        self.states.read().await.clone()
    }
}

impl Default for AlertStateTracker {
    fn default() -> Self {
        Self::new(CooldownConfig::default())
    }
}

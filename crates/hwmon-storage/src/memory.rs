use crate::store::{AlertStore, StoreError};
use async_trait::async_trait;
use hwmon_types::Alert;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// 内存告警日志，超出容量时丢弃最旧的记录
pub struct MemoryAlertStore {
    alerts: RwLock<VecDeque<Alert>>,
    max_history: usize,
}

impl MemoryAlertStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            alerts: RwLock::new(VecDeque::with_capacity(max_history.min(1024))),
            max_history: max_history.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.alerts.read().await.len()
    }
}

impl Default for MemoryAlertStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn record(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut alerts = self.alerts.write().await;
        alerts.push_back(alert.clone());
        while alerts.len() > self.max_history {
            alerts.pop_front();
        }
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Alert>, StoreError> {
        let alerts = self.alerts.read().await;
        Ok(alerts.iter().rev().take(limit).cloned().collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

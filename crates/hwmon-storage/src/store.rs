use async_trait::async_trait;
use hwmon_types::Alert;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// 只追加的告警日志
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// 追加一条告警
    async fn record(&self, alert: &Alert) -> Result<(), StoreError>;

    /// 最近的 `limit` 条告警，最新的在前
    async fn recent(&self, limit: usize) -> Result<Vec<Alert>, StoreError>;

    fn name(&self) -> &str;
}

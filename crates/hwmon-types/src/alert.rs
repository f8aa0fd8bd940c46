use crate::threshold::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 已批准发送的告警事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub metric_id: String,
    pub status: Status,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub notification_count: u32,
}

impl Alert {
    pub fn new(
        metric_id: impl Into<String>,
        status: Status,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
        notification_count: u32,
    ) -> Self {
        Self {
            metric_id: metric_id.into(),
            status,
            message: message.into(),
            timestamp,
            notification_count,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.status == Status::Critical
    }

    /// 广播给实时订阅者的载荷 `{message, status}`
    pub fn broadcast_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "message": self.message,
            "status": self.status,
        })
    }
}

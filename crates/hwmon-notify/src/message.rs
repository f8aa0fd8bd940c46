use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NotifyLevel {
    Info,
    Warning,
    Critical,
}

/// 通知渠道
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotifyChannel {
    Pushbullet,
    Webhook,
    Slack,
}

/// 推送消息：标题 + 正文
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyMessage {
    pub title: String,
    pub body: String,
    pub level: NotifyLevel,
    pub timestamp: DateTime<Utc>,
    pub metadata: Option<serde_json::Value>,
}

impl NotifyMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>, level: NotifyLevel) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            level,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn critical(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body, NotifyLevel::Critical)
    }
}

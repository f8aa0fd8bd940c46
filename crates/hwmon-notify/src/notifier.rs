use crate::message::NotifyMessage;
use anyhow::Result;
use async_trait::async_trait;

/// 单个渠道的投递结果；HTTP 层面的拒绝用 `failure` 表示，网络错误走 `Err`
#[derive(Debug, Clone)]
pub struct NotifyResult {
    pub success: bool,
    pub message: String,
}

impl NotifyResult {
    pub fn success() -> Self {
        Self {
            success: true,
            message: "delivered".to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// 推送通知器 trait
///
/// 每条消息只尝试一次，不做重试。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 发送通知
    async fn send(&self, message: &NotifyMessage) -> Result<NotifyResult>;

    /// 通知器名称
    fn name(&self) -> &str;

    /// 是否启用
    fn is_enabled(&self) -> bool {
        true
    }
}

use crate::message::{NotifyChannel, NotifyLevel, NotifyMessage};
use crate::notifier::Notifier;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// 通知管理器
pub struct NotifyManager {
    notifiers: Arc<RwLock<HashMap<NotifyChannel, Box<dyn Notifier>>>>,

    /// 最小通知级别
    min_level: NotifyLevel,
}

impl NotifyManager {
    pub fn new(min_level: NotifyLevel) -> Self {
        Self {
            notifiers: Arc::new(RwLock::new(HashMap::new())),
            min_level,
        }
    }

    /// 注册通知器
    pub async fn register(&self, channel: NotifyChannel, notifier: Box<dyn Notifier>) {
        let mut notifiers = self.notifiers.write().await;
        info!("Registered notifier: {}", notifier.name());
        notifiers.insert(channel, notifier);
    }

    pub async fn notifier_count(&self) -> usize {
        self.notifiers.read().await.len()
    }

    /// 发送到所有已启用的渠道
    ///
    /// 每个渠道独立尝试，一个失败不影响其他渠道；返回成功送达的渠道数。
    /// 只要有渠道失败就返回错误，错误信息汇总所有失败渠道。
    pub async fn broadcast(&self, message: &NotifyMessage) -> Result<usize> {
        if !self.should_notify(&message.level) {
            return Ok(0);
        }

        let notifiers = self.notifiers.read().await;
        let mut delivered = 0;
        let mut failures = Vec::new();

        for notifier in notifiers.values() {
            if !notifier.is_enabled() {
                continue;
            }

            match notifier.send(message).await {
                Ok(result) if result.success => {
                    info!("Notification sent via {}: {}", notifier.name(), message.title);
                    delivered += 1;
                }
                Ok(result) => {
                    error!("Notification failed via {}: {}", notifier.name(), result.message);
                    failures.push(format!("{}: {}", notifier.name(), result.message));
                }
                Err(e) => {
                    error!("Notification error via {}: {}", notifier.name(), e);
                    failures.push(format!("{}: {}", notifier.name(), e));
                }
            }
        }

        if failures.is_empty() {
            Ok(delivered)
        } else {
            Err(anyhow!("{} notifier(s) failed: {}", failures.len(), failures.join("; ")))
        }
    }

    fn should_notify(&self, level: &NotifyLevel) -> bool {
        *level >= self.min_level
    }
}

impl Default for NotifyManager {
    fn default() -> Self {
        Self::new(NotifyLevel::Info)
    }
}

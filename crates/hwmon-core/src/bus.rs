use crate::error::Result;
use hwmon_types::Message;
use tokio::sync::broadcast;
use tracing::debug;

/// 实时订阅者使用的默认主题
pub const MONITOR_TOPIC: &str = "hardware_monitor";

/// 只发布、不确认的广播通道
///
/// 返回本次送达的订阅者数量；没有订阅者时返回 0，不视为错误。
pub trait Broadcaster: Send + Sync {
    fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<usize>;
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Message>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Broadcaster for EventBus {
    fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<usize> {
        if self.sender.receiver_count() == 0 {
            debug!(topic = %topic, "No live subscribers, dropping event");
            return Ok(0);
        }

        match self.sender.send(Message::new(topic, payload)) {
            Ok(n) => Ok(n),
            // 订阅者在检查之后断开
            Err(_) => Ok(0),
        }
    }
}

pub mod alert;
pub mod message;
pub mod metric;
pub mod threshold;

pub use alert::Alert;
pub use message::Message;
pub use metric::{HistoryEntry, MetricSample};
pub use threshold::{CooldownConfig, Polarity, Status, ThresholdSpec, MAX_COOLDOWN_MINUTES};

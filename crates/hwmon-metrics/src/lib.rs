pub mod classifier;
pub mod collector;
pub mod dispatcher;
pub mod history;
pub mod metrics;
pub mod monitor;
pub mod snapshot;
pub mod tracker;

pub use classifier::{classify, recovery_message, ThresholdClassifier};
pub use collector::{CollectError, Collector, RateTracker, SystemCollector};
pub use dispatcher::{DispatchReport, NotificationDispatcher, SinkOutcome};
pub use history::HistoryBuffer;
pub use metrics::MonitorMetrics;
pub use monitor::{default_metrics, MonitorLoop, MonitorSettings, MonitorTaskHandle, SharedSnapshot};
pub use snapshot::{MetricReading, Snapshot, SystemInfo};
pub use tracker::{AlertState, AlertStateTracker};

pub mod global;
pub mod loader;
pub mod thresholds;

pub use global::{
    AppConfig, LoggingConfig, MonitorSection, NotifyConfig, ServerConfig, StorageConfig,
};
pub use loader::ConfigLoader;
pub use thresholds::{default_thresholds, ThresholdEntry};

use crate::thresholds::{default_thresholds, ThresholdEntry};
use hwmon_types::{CooldownConfig, ThresholdSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 全局配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub monitor: MonitorSection,
    #[serde(default)]
    pub cooldown: CooldownConfig,
    #[serde(default = "default_thresholds")]
    pub thresholds: BTreeMap<String, ThresholdEntry>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 按指标名展开的阈值配置
    pub fn threshold_specs(&self) -> BTreeMap<String, ThresholdSpec> {
        self.thresholds
            .iter()
            .map(|(metric, entry)| (metric.clone(), entry.to_spec(metric)))
            .collect()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorSection::default(),
            cooldown: CooldownConfig::default(),
            thresholds: default_thresholds(),
            storage: StorageConfig::default(),
            notify: NotifyConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// 采样循环配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorSection {
    /// 两次采样之间的休眠时间（秒）
    pub interval_secs: u64,

    /// 每个指标保留的历史条数
    pub history_capacity: usize,

    /// 单个通知渠道的超时（毫秒）
    pub sink_timeout_ms: u64,

    /// 指标从告警恢复为 ok 时是否记录并广播恢复消息
    pub notify_recovery: bool,

    /// 按顺序采样的指标
    pub metrics: Vec<String>,

    /// 延迟探测目标
    pub latency_target: String,

    /// 磁盘使用率统计的挂载点
    pub disk_path: PathBuf,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            history_capacity: 1440,
            sink_timeout_ms: 3000,
            notify_recovery: false,
            metrics: [
                "cpu",
                "ram",
                "disk",
                "temperature",
                "network",
                "battery",
                "network_speed",
                "disk_read_speed",
                "disk_write_speed",
            ]
            .iter()
            .map(|m| m.to_string())
            .collect(),
            latency_target: "8.8.8.8".to_string(),
            disk_path: PathBuf::from("/"),
        }
    }
}

/// 告警日志配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 为空时使用内存日志
    pub alert_log: Option<PathBuf>,
    pub recent_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            alert_log: Some(PathBuf::from("./data/alerts.jsonl")),
            recent_capacity: 100,
        }
    }
}

/// 推送渠道配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub pushbullet_token: Option<String>,
    pub webhook_url: Option<String>,
    pub slack_webhook: Option<String>,
    pub push_title: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            pushbullet_token: None,
            webhook_url: None,
            slack_webhook: None,
            push_title: "Hardware Monitor Critical Alert".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

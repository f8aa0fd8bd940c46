use chrono::{DateTime, Utc};
use hwmon_types::Status;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use sysinfo::System;

/// 主机静态信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub kernel_version: Option<String>,
    pub host_name: Option<String>,
}

impl SystemInfo {
    pub fn detect() -> Self {
        Self {
            os_name: System::name(),
            os_version: System::os_version(),
            kernel_version: System::kernel_version(),
            host_name: System::host_name(),
        }
    }
}

/// 单个指标在本周期的读数；没有阈值的指标 `status` 为空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    pub value: f64,
    pub status: Option<Status>,
    pub message: Option<String>,
    /// 采集器提供的明细，例如每核使用率、分区列表
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl MetricReading {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            status: None,
            message: None,
            details: None,
        }
    }

    pub fn with_status(mut self, status: Status, message: Option<String>) -> Self {
        self.status = Some(status);
        self.message = message;
        self
    }

    pub fn with_details(mut self, details: Option<serde_json::Value>) -> Self {
        self.details = details;
        self
    }
}

/// 一个监控周期的完整结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub metrics: BTreeMap<String, MetricReading>,
    pub system: SystemInfo,
}

impl Snapshot {
    pub fn new(timestamp: DateTime<Utc>, system: SystemInfo) -> Self {
        Self {
            timestamp,
            metrics: BTreeMap::new(),
            system,
        }
    }

    pub fn insert(&mut self, metric_id: impl Into<String>, reading: MetricReading) {
        self.metrics.insert(metric_id.into(), reading);
    }

    pub fn value(&self, metric_id: &str) -> Option<f64> {
        self.metrics.get(metric_id).map(|reading| reading.value)
    }

    /// 本周期最严重的状态
    pub fn worst_status(&self) -> Status {
        self.metrics
            .values()
            .filter_map(|reading| reading.status)
            .max()
            .unwrap_or_default()
    }

    /// 广播给实时订阅者的载荷 `{data: <snapshot>}`
    pub fn broadcast_payload(&self) -> serde_json::Result<serde_json::Value> {
        Ok(serde_json::json!({ "data": serde_json::to_value(self)? }))
    }
}

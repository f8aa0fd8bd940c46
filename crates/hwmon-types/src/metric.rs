use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 一次采样结果，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub metric_id: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    pub fn new(metric_id: impl Into<String>, value: f64) -> Self {
        Self::at(metric_id, value, Utc::now())
    }

    pub fn at(metric_id: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            metric_id: metric_id.into(),
            value,
            timestamp,
        }
    }
}

/// 历史缓冲区中的一条记录
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl From<&MetricSample> for HistoryEntry {
    fn from(sample: &MetricSample) -> Self {
        Self {
            timestamp: sample.timestamp,
            value: sample.value,
        }
    }
}

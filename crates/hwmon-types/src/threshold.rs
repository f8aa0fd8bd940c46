use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 指标状态，按严重程度排序：Ok < Warning < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Warning,
    Critical,
}

impl Status {
    /// 用于告警消息前缀的标签
    pub fn label(&self) -> &'static str {
        match self {
            Status::Ok => "Ok",
            Status::Warning => "Warning",
            Status::Critical => "Critical",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Warning => "warning",
            Status::Critical => "critical",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 阈值方向
///
/// `Above`: 数值越高越糟（CPU、内存、磁盘、温度、延迟）
/// `Below`: 数值越低越糟（电池电量）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Above,
    Below,
}

impl Default for Polarity {
    fn default() -> Self {
        Polarity::Above
    }
}

/// 单个指标的阈值配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSpec {
    pub metric_id: String,
    pub warning: f64,
    pub critical: f64,
    #[serde(default)]
    pub polarity: Polarity,
}

impl ThresholdSpec {
    pub fn above(metric_id: impl Into<String>, warning: f64, critical: f64) -> Self {
        Self {
            metric_id: metric_id.into(),
            warning,
            critical,
            polarity: Polarity::Above,
        }
    }

    pub fn below(metric_id: impl Into<String>, warning: f64, critical: f64) -> Self {
        Self {
            metric_id: metric_id.into(),
            warning,
            critical,
            polarity: Polarity::Below,
        }
    }

    /// 阈值顺序是否与方向一致
    pub fn is_ordered(&self) -> bool {
        match self.polarity {
            Polarity::Above => self.warning <= self.critical,
            Polarity::Below => self.warning >= self.critical,
        }
    }
}

/// 冷却时间允许的最大分钟数，超过后无法用 `chrono::Duration` 表示
pub const MAX_COOLDOWN_MINUTES: i64 = i64::MAX / 60_000;

/// 同一状态持续时的重复通知间隔（分钟），所有指标共享
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    pub warning_minutes: i64,
    pub critical_minutes: i64,
}

impl CooldownConfig {
    pub fn new(warning_minutes: i64, critical_minutes: i64) -> Self {
        Self {
            warning_minutes,
            critical_minutes,
        }
    }

    /// `Ok` 状态没有冷却窗口，持续的 `Ok` 不会重复通知；
    /// 无法表示的冷却时间同样返回 `None`
    pub fn for_status(&self, status: Status) -> Option<Duration> {
        match status {
            Status::Ok => None,
            Status::Warning => Duration::try_minutes(self.warning_minutes),
            Status::Critical => Duration::try_minutes(self.critical_minutes),
        }
    }

    pub fn is_valid(&self) -> bool {
        (0..=MAX_COOLDOWN_MINUTES).contains(&self.warning_minutes)
            && (0..=MAX_COOLDOWN_MINUTES).contains(&self.critical_minutes)
    }
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            warning_minutes: 15,
            critical_minutes: 5,
        }
    }
}

use hwmon_types::{Polarity, Status, ThresholdSpec};
use std::collections::BTreeMap;

/// 按阈值对单个数值分级
///
/// 阈值边界本身算作安全一侧：`Above` 下 `value == critical` 是 Warning，
/// `Below` 下 `value == critical` 同样是 Warning。
pub fn classify(metric_id: &str, value: f64, spec: &ThresholdSpec) -> (Status, Option<String>) {
    let status = match spec.polarity {
        Polarity::Below => {
            if value < spec.critical {
                Status::Critical
            } else if value < spec.warning {
                Status::Warning
            } else {
                Status::Ok
            }
        }
        Polarity::Above => {
            if value > spec.critical {
                Status::Critical
            } else if value > spec.warning {
                Status::Warning
            } else {
                Status::Ok
            }
        }
    };

    (status, message(metric_id, value, status, spec.polarity))
}

fn message(metric_id: &str, value: f64, status: Status, polarity: Polarity) -> Option<String> {
    if status.is_ok() {
        return None;
    }

    Some(match polarity {
        Polarity::Above => format!("{}: High {}: {:.1}", status.label(), metric_id, value),
        Polarity::Below => format!("{}: Low {}: {:.1}%", status.label(), metric_id, value),
    })
}

/// 指标恢复为 ok 时的提示文本
pub fn recovery_message(metric_id: &str, value: f64) -> String {
    format!("Recovered: {}: {:.1}", metric_id, value)
}

/// 持有全部阈值配置的分级器
#[derive(Debug, Clone, Default)]
pub struct ThresholdClassifier {
    specs: BTreeMap<String, ThresholdSpec>,
}

impl ThresholdClassifier {
    pub fn new(specs: BTreeMap<String, ThresholdSpec>) -> Self {
        Self { specs }
    }

    pub fn from_specs(specs: impl IntoIterator<Item = ThresholdSpec>) -> Self {
        Self {
            specs: specs
                .into_iter()
                .map(|spec| (spec.metric_id.clone(), spec))
                .collect(),
        }
    }

    /// 没有阈值的指标只记录历史，不分级
    pub fn classify(&self, metric_id: &str, value: f64) -> Option<(Status, Option<String>)> {
        self.specs
            .get(metric_id)
            .map(|spec| classify(metric_id, value, spec))
    }

    pub fn spec(&self, metric_id: &str) -> Option<&ThresholdSpec> {
        self.specs.get(metric_id)
    }

    pub fn rule_count(&self) -> usize {
        self.specs.len()
    }
}

use hwmon_types::{Polarity, ThresholdSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `[thresholds.<metric>]` 配置段，指标名取自键
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ThresholdEntry {
    pub warning: f64,
    pub critical: f64,
    #[serde(default)]
    pub polarity: Polarity,
}

impl ThresholdEntry {
    pub fn to_spec(&self, metric_id: &str) -> ThresholdSpec {
        ThresholdSpec {
            metric_id: metric_id.to_string(),
            warning: self.warning,
            critical: self.critical,
            polarity: self.polarity,
        }
    }
}

fn above(warning: f64, critical: f64) -> ThresholdEntry {
    ThresholdEntry {
        warning,
        critical,
        polarity: Polarity::Above,
    }
}

/// 默认阈值
pub fn default_thresholds() -> BTreeMap<String, ThresholdEntry> {
    let mut thresholds = BTreeMap::new();
    thresholds.insert("cpu".to_string(), above(80.0, 90.0));
    thresholds.insert("ram".to_string(), above(80.0, 90.0));
    thresholds.insert("disk".to_string(), above(85.0, 95.0));
    thresholds.insert("temperature".to_string(), above(75.0, 85.0));
    // 网络延迟，毫秒
    thresholds.insert("network".to_string(), above(150.0, 300.0));
    thresholds.insert(
        "battery".to_string(),
        ThresholdEntry {
            warning: 20.0,
            critical: 10.0,
            polarity: Polarity::Below,
        },
    );
    thresholds
}

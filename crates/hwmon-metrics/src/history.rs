use chrono::{DateTime, Duration, Utc};
use hwmon_types::{HistoryEntry, MetricSample};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// 每个指标默认保留的历史条数
pub const DEFAULT_HISTORY_CAPACITY: usize = 1440;

/// 按指标分组的定长历史环
///
/// 超出容量时丢弃最旧的条目；查询返回副本。
#[derive(Clone)]
pub struct HistoryBuffer {
    entries: Arc<RwLock<HashMap<String, VecDeque<HistoryEntry>>>>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn append(&self, sample: &MetricSample) {
        let mut entries = self.entries.write().await;
        let ring = entries
            .entry(sample.metric_id.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity.min(64)));

        while ring.len() >= self.capacity {
            ring.pop_front();
        }
        ring.push_back(HistoryEntry::from(sample));
    }

    /// 最近 `window_minutes` 分钟内的条目，按时间升序
    pub async fn query(&self, metric_id: &str, window_minutes: i64) -> Vec<HistoryEntry> {
        self.query_at(metric_id, window_minutes, Utc::now()).await
    }

    pub async fn query_at(
        &self,
        metric_id: &str,
        window_minutes: i64,
        now: DateTime<Utc>,
    ) -> Vec<HistoryEntry> {
        // 窗口超出可表示的时间范围时等同于不设下限
        let cutoff = Duration::try_minutes(window_minutes).and_then(|w| now.checked_sub_signed(w));
        let entries = self.entries.read().await;

        entries
            .get(metric_id)
            .map(|ring| {
                ring.iter()
                    .filter(|entry| cutoff.map_or(true, |cutoff| entry.timestamp > cutoff))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn len(&self, metric_id: &str) -> usize {
        self.entries
            .read()
            .await
            .get(metric_id)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    /// 已有历史的指标名，排序后返回
    pub async fn metrics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

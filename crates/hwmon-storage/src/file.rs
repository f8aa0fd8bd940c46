use crate::store::{AlertStore, StoreError};
use async_trait::async_trait;
use hwmon_types::Alert;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// 从文件末尾向前读取的块大小
const READ_CHUNK: u64 = 8 * 1024;

/// JSON Lines 格式的告警日志文件
///
/// 每条告警一行，只追加不修改。`recent` 从文件末尾分块向前读，只读取需要的部分。
pub struct FileAlertStore {
    path: PathBuf,
    /// 串行化写入，保证行完整
    write_lock: Mutex<()>,
}

impl FileAlertStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent_dir(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// 按从新到旧解析 `region` 中的行，直到凑满 `limit` 条
    fn collect_lines(&self, region: &[u8], limit: usize, alerts: &mut Vec<Alert>) {
        for line in region.rsplit(|&b| b == b'\n') {
            if alerts.len() >= limit {
                return;
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<Alert>(line) {
                Ok(alert) => alerts.push(alert),
                // 进程中断可能留下半行
                Err(e) => warn!(path = ?self.path, error = %e, "Skipping malformed alert line"),
            }
        }
    }
}

#[async_trait]
impl AlertStore for FileAlertStore {
    async fn record(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(alert)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        self.ensure_parent_dir().await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        debug!(path = ?self.path, metric = %alert.metric_id, "Alert appended to log");
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Alert>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut pos = file.metadata().await?.len();
        // 上一块开头不完整的行片段
        let mut fragment: Vec<u8> = Vec::new();
        let mut alerts = Vec::with_capacity(limit.min(1024));

        while pos > 0 && alerts.len() < limit {
            let size = READ_CHUNK.min(pos);
            pos -= size;

            let mut chunk = vec![0u8; size as usize];
            file.seek(SeekFrom::Start(pos)).await?;
            file.read_exact(&mut chunk).await?;
            chunk.extend_from_slice(&fragment);

            let start = if pos == 0 {
                0
            } else {
                match chunk.iter().position(|&b| b == b'\n') {
                    Some(newline) => newline + 1,
                    None => {
                        fragment = chunk;
                        continue;
                    }
                }
            };

            self.collect_lines(&chunk[start..], limit, &mut alerts);
            chunk.truncate(start.saturating_sub(1));
            fragment = chunk;
        }

        Ok(alerts)
    }

    fn name(&self) -> &str {
        "file"
    }
}

use crate::snapshot::SystemInfo;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use sysinfo::{Components, Disks, Networks, System};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

pub const METRIC_CPU: &str = "cpu";
pub const METRIC_RAM: &str = "ram";
pub const METRIC_DISK: &str = "disk";
pub const METRIC_TEMPERATURE: &str = "temperature";
pub const METRIC_NETWORK: &str = "network";
pub const METRIC_BATTERY: &str = "battery";
pub const METRIC_NETWORK_SPEED: &str = "network_speed";
pub const METRIC_DISK_READ_SPEED: &str = "disk_read_speed";
pub const METRIC_DISK_WRITE_SPEED: &str = "disk_write_speed";

/// ping 的最长等待时间
pub const PING_TIMEOUT: Duration = Duration::from_secs(2);

const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Metric unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Collection failed: {0}")]
    Failed(String),
}

/// 指标采集器
///
/// 每个周期先调用一次 `refresh`，再对每个指标调用 `sample`。单个指标失败只影响该指标。
#[async_trait]
pub trait Collector: Send + Sync {
    async fn refresh(&mut self) -> Result<(), CollectError> {
        Ok(())
    }

    async fn sample(&mut self, metric_id: &str) -> Result<f64, CollectError>;

    /// 指标的附加明细，随快照一起输出
    fn details(&self, _metric_id: &str) -> Option<Value> {
        None
    }

    fn system_info(&self) -> SystemInfo {
        SystemInfo::default()
    }
}

/// 记录两次刷新之间实际经过的时间
#[derive(Debug, Default)]
pub struct RateTracker {
    last: Option<Instant>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started_at(instant: Instant) -> Self {
        Self {
            last: Some(instant),
        }
    }

    /// 返回距上次调用经过的时间，首次调用返回 None
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        let elapsed = self.last.map(|last| now.saturating_duration_since(last));
        self.last = Some(now);
        elapsed.filter(|d| !d.is_zero())
    }
}

/// 收发字节数的平均速率（字节/秒）
pub fn bytes_per_second(received: u64, transmitted: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return None;
    }
    Some((received as f64 / secs + transmitted as f64 / secs) / 2.0)
}

/// 字节数换算成 MB/s
pub fn megabytes_per_second(bytes: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return None;
    }
    Some(bytes as f64 / secs / (1024.0 * 1024.0))
}

/// 从 ping 输出中解析 `time=12.3 ms`
pub fn parse_ping_latency(output: &str) -> Option<f64> {
    let start = output.find("time=")? + "time=".len();
    let rest = &output[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// 基于 sysinfo 的默认采集器
pub struct SystemCollector {
    system: System,
    disks: Disks,
    components: Components,
    networks: Networks,
    rate: RateTracker,
    network_speed: Option<f64>,
    disk_read_speed: Option<f64>,
    disk_write_speed: Option<f64>,
    // 上一次刷新以来所有进程的读写字节数
    disk_io: (u64, u64),
    power_plugged: Option<bool>,
    disk_path: PathBuf,
    latency_target: String,
    power_supply_dir: PathBuf,
    info: SystemInfo,
}

impl SystemCollector {
    pub fn new(disk_path: impl Into<PathBuf>, latency_target: impl Into<String>) -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        system.refresh_memory();
        // 先建立进程 IO 基线，之后的刷新只统计增量
        system.refresh_processes();

        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            components: Components::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            rate: RateTracker::started_at(Instant::now()),
            network_speed: None,
            disk_read_speed: None,
            disk_write_speed: None,
            disk_io: (0, 0),
            power_plugged: None,
            disk_path: disk_path.into(),
            latency_target: latency_target.into(),
            power_supply_dir: PathBuf::from(POWER_SUPPLY_DIR),
            info: SystemInfo::detect(),
        }
    }

    pub fn with_power_supply_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.power_supply_dir = dir.into();
        self
    }

    fn cpu_percent(&self) -> f64 {
        self.system.global_cpu_info().cpu_usage() as f64
    }

    fn ram_percent(&self) -> Result<f64, CollectError> {
        let total = self.system.total_memory();
        if total == 0 {
            return Err(CollectError::Unavailable("total memory is zero".to_string()));
        }
        Ok(self.system.used_memory() as f64 / total as f64 * 100.0)
    }

    fn disk_percent(&self) -> Result<f64, CollectError> {
        let disk = self
            .disks
            .list()
            .iter()
            .filter(|disk| self.disk_path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().components().count())
            .ok_or_else(|| {
                CollectError::Unavailable(format!("no disk mounted at {}", self.disk_path.display()))
            })?;

        let total = disk.total_space();
        if total == 0 {
            return Err(CollectError::Unavailable(format!(
                "disk {} reports zero size",
                disk.mount_point().display()
            )));
        }
        let used = total.saturating_sub(disk.available_space());
        Ok(used as f64 / total as f64 * 100.0)
    }

    fn hottest_temperature(&self) -> Result<f64, CollectError> {
        self.components
            .list()
            .iter()
            .map(|component| component.temperature() as f64)
            .filter(|t| t.is_finite())
            .fold(None, |max: Option<f64>, t| Some(max.map_or(t, |m| m.max(t))))
            .ok_or_else(|| CollectError::Unavailable("no temperature sensor".to_string()))
    }

    async fn ping_latency(&self) -> Result<f64, CollectError> {
        let output = tokio::time::timeout(
            PING_TIMEOUT,
            Command::new("ping")
                .args(["-c", "1", "-W", "2", self.latency_target.as_str()])
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| CollectError::Unavailable(format!("ping {} timed out", self.latency_target)))?
        .map_err(|e| CollectError::Failed(format!("ping: {}", e)))?;

        if !output.status.success() {
            return Err(CollectError::Unavailable(format!(
                "ping {} failed",
                self.latency_target
            )));
        }

        parse_ping_latency(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| CollectError::Failed("unparseable ping output".to_string()))
    }

    async fn battery_percent(&mut self) -> Result<f64, CollectError> {
        let capacity = read_battery_capacity(&self.power_supply_dir).await?;
        self.power_plugged = read_power_plugged(&self.power_supply_dir).await;
        Ok(capacity)
    }

    fn cpu_details(&self) -> Value {
        let cpus = self.system.cpus();
        json!({
            "frequency_mhz": cpus.first().map(|cpu| cpu.frequency()).unwrap_or(0),
            "cores": cpus.len(),
            "per_core_usage": cpus.iter().map(|cpu| cpu.cpu_usage()).collect::<Vec<_>>(),
        })
    }

    fn ram_details(&self) -> Value {
        json!({
            "total": self.system.total_memory(),
            "used": self.system.used_memory(),
            "available": self.system.available_memory(),
            "swap_total": self.system.total_swap(),
            "swap_used": self.system.used_swap(),
        })
    }

    fn disk_details(&self) -> Value {
        let partitions: Vec<Value> = self
            .disks
            .list()
            .iter()
            .map(|disk| {
                json!({
                    "device": disk.name().to_string_lossy(),
                    "mount_point": disk.mount_point().display().to_string(),
                    "file_system": disk.file_system().to_string_lossy(),
                    "total": disk.total_space(),
                    "available": disk.available_space(),
                })
            })
            .collect();

        json!({
            "partitions": partitions,
            "read_bytes": self.disk_io.0,
            "written_bytes": self.disk_io.1,
            "read_speed_mb": self.disk_read_speed,
            "write_speed_mb": self.disk_write_speed,
        })
    }

    fn temperature_details(&self) -> Value {
        let sensors: serde_json::Map<String, Value> = self
            .components
            .list()
            .iter()
            .filter(|component| component.temperature().is_finite())
            .map(|component| (component.label().to_string(), json!(component.temperature())))
            .collect();
        json!({ "sensors": sensors })
    }

    fn network_details(&self) -> Value {
        let mut totals = [0u64; 6];
        for (_, data) in self.networks.list().iter() {
            let counters = [
                data.received(),
                data.transmitted(),
                data.packets_received(),
                data.packets_transmitted(),
                data.total_received(),
                data.total_transmitted(),
            ];
            for (total, counter) in totals.iter_mut().zip(counters) {
                *total = total.saturating_add(counter);
            }
        }

        json!({
            "latency_target": self.latency_target,
            "received": totals[0],
            "transmitted": totals[1],
            "packets_received": totals[2],
            "packets_transmitted": totals[3],
            "total_received": totals[4],
            "total_transmitted": totals[5],
        })
    }
}

async fn first_battery(dir: &Path) -> Result<PathBuf, CollectError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|_| CollectError::Unavailable("no power supply class".to_string()))?;

    let mut batteries = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name().to_string_lossy().starts_with("BAT") {
            batteries.push(entry.path());
        }
    }
    batteries.sort();

    batteries
        .into_iter()
        .next()
        .ok_or_else(|| CollectError::Unavailable("no battery".to_string()))
}

/// 读取第一块 `BAT*` 电池的电量百分比
pub async fn read_battery_capacity(dir: &Path) -> Result<f64, CollectError> {
    let battery = first_battery(dir).await?;

    let raw = tokio::fs::read_to_string(battery.join("capacity"))
        .await
        .map_err(|e| CollectError::Failed(format!("{}: {}", battery.display(), e)))?;

    raw.trim()
        .parse::<f64>()
        .map_err(|e| CollectError::Failed(format!("battery capacity {:?}: {}", raw.trim(), e)))
}

/// 电池是否接着电源；只有 `Discharging` 视为未接电源
pub async fn read_power_plugged(dir: &Path) -> Option<bool> {
    let battery = first_battery(dir).await.ok()?;
    let status = tokio::fs::read_to_string(battery.join("status")).await.ok()?;
    match status.trim() {
        "" | "Unknown" => None,
        status => Some(status != "Discharging"),
    }
}

#[async_trait]
impl Collector for SystemCollector {
    async fn refresh(&mut self) -> Result<(), CollectError> {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.disks.refresh();
        self.components.refresh();
        self.networks.refresh();

        let (received, transmitted) = self
            .networks
            .list()
            .iter()
            .fold((0u64, 0u64), |(rx, tx), (_, data)| {
                (rx + data.received(), tx + data.transmitted())
            });

        self.system.refresh_processes();
        let (disk_read, disk_written) =
            self.system
                .processes()
                .values()
                .fold((0u64, 0u64), |(read, written), process| {
                    let usage = process.disk_usage();
                    (
                        read.saturating_add(usage.read_bytes),
                        written.saturating_add(usage.written_bytes),
                    )
                });
        self.disk_io = (disk_read, disk_written);

        // 所有速率共用同一段实测间隔
        let elapsed = self.rate.tick(Instant::now());
        self.network_speed =
            elapsed.and_then(|elapsed| bytes_per_second(received, transmitted, elapsed));
        self.disk_read_speed = elapsed.and_then(|elapsed| megabytes_per_second(disk_read, elapsed));
        self.disk_write_speed =
            elapsed.and_then(|elapsed| megabytes_per_second(disk_written, elapsed));

        debug!(
            received,
            transmitted,
            disk_read,
            disk_written,
            "System counters refreshed"
        );
        Ok(())
    }

    async fn sample(&mut self, metric_id: &str) -> Result<f64, CollectError> {
        match metric_id {
            METRIC_CPU => Ok(self.cpu_percent()),
            METRIC_RAM => self.ram_percent(),
            METRIC_DISK => self.disk_percent(),
            METRIC_TEMPERATURE => self.hottest_temperature(),
            METRIC_NETWORK => self.ping_latency().await,
            METRIC_BATTERY => self.battery_percent().await,
            METRIC_NETWORK_SPEED => self
                .network_speed
                .ok_or_else(|| CollectError::Unavailable("no network rate yet".to_string())),
            METRIC_DISK_READ_SPEED => self
                .disk_read_speed
                .ok_or_else(|| CollectError::Unavailable("no disk read rate yet".to_string())),
            METRIC_DISK_WRITE_SPEED => self
                .disk_write_speed
                .ok_or_else(|| CollectError::Unavailable("no disk write rate yet".to_string())),
            other => Err(CollectError::UnknownMetric(other.to_string())),
        }
    }

    fn details(&self, metric_id: &str) -> Option<Value> {
        match metric_id {
            METRIC_CPU => Some(self.cpu_details()),
            METRIC_RAM => Some(self.ram_details()),
            METRIC_DISK => Some(self.disk_details()),
            METRIC_TEMPERATURE => Some(self.temperature_details()),
            METRIC_NETWORK => Some(self.network_details()),
            METRIC_BATTERY => self
                .power_plugged
                .map(|plugged| json!({ "power_plugged": plugged })),
            _ => None,
        }
    }

    fn system_info(&self) -> SystemInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_ping_latency() {
        let output = "PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.\n\
                      64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=12.3 ms\n";
        assert_eq!(parse_ping_latency(output), Some(12.3));
        assert_eq!(parse_ping_latency("time=7 ms"), Some(7.0));
        assert_eq!(parse_ping_latency("Request timeout"), None);
    }

    #[test]
    fn test_rate_uses_measured_elapsed() {
        let start = Instant::now();
        let mut tracker = RateTracker::started_at(start);

        let elapsed = tracker.tick(start + Duration::from_secs(8)).unwrap();
        assert_eq!(elapsed, Duration::from_secs(8));
        assert_eq!(bytes_per_second(8000, 4000, elapsed), Some(750.0));

        assert!(RateTracker::new().tick(start).is_none());
    }

    #[test]
    fn test_bytes_per_second_zero_elapsed() {
        assert_eq!(bytes_per_second(100, 100, Duration::ZERO), None);
        assert_eq!(megabytes_per_second(100, Duration::ZERO), None);
    }

    #[test]
    fn test_disk_rate_in_megabytes() {
        let elapsed = Duration::from_secs(4);
        assert_eq!(megabytes_per_second(8 * 1024 * 1024, elapsed), Some(2.0));
        assert_eq!(megabytes_per_second(0, elapsed), Some(0.0));
    }

    #[tokio::test]
    async fn test_battery_capacity_from_power_supply() {
        let temp_dir = TempDir::new().unwrap();
        let bat = temp_dir.path().join("BAT0");
        tokio::fs::create_dir_all(&bat).await.unwrap();
        tokio::fs::create_dir_all(temp_dir.path().join("AC")).await.unwrap();
        tokio::fs::write(bat.join("capacity"), "87\n").await.unwrap();

        let value = read_battery_capacity(temp_dir.path()).await.unwrap();
        assert_eq!(value, 87.0);
    }

    #[tokio::test]
    async fn test_power_plugged_from_status() {
        let temp_dir = TempDir::new().unwrap();
        let bat = temp_dir.path().join("BAT0");
        tokio::fs::create_dir_all(&bat).await.unwrap();
        tokio::fs::write(bat.join("capacity"), "40\n").await.unwrap();

        assert_eq!(read_power_plugged(temp_dir.path()).await, None);

        tokio::fs::write(bat.join("status"), "Discharging\n").await.unwrap();
        assert_eq!(read_power_plugged(temp_dir.path()).await, Some(false));

        tokio::fs::write(bat.join("status"), "Charging\n").await.unwrap();
        assert_eq!(read_power_plugged(temp_dir.path()).await, Some(true));

        let mut collector =
            SystemCollector::new("/", "127.0.0.1").with_power_supply_dir(temp_dir.path());
        assert!(collector.details(METRIC_BATTERY).is_none());
        assert_eq!(collector.sample(METRIC_BATTERY).await.unwrap(), 40.0);
        assert_eq!(
            collector.details(METRIC_BATTERY),
            Some(json!({ "power_plugged": true }))
        );
    }

    #[tokio::test]
    async fn test_no_battery_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let result = read_battery_capacity(temp_dir.path()).await;
        assert!(matches!(result, Err(CollectError::Unavailable(_))));

        let missing = read_battery_capacity(&temp_dir.path().join("missing")).await;
        assert!(matches!(missing, Err(CollectError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_unknown_metric() {
        let mut collector = SystemCollector::new("/", "127.0.0.1");
        let result = collector.sample("gpu").await;
        assert!(matches!(result, Err(CollectError::UnknownMetric(_))));
    }

    #[tokio::test]
    async fn test_ram_sample_in_range() {
        let mut collector = SystemCollector::new("/", "127.0.0.1");
        collector.refresh().await.unwrap();

        if let Ok(ram) = collector.sample(METRIC_RAM).await {
            assert!((0.0..=100.0).contains(&ram));
        }
    }

    #[tokio::test]
    async fn test_details_per_metric() {
        let mut collector = SystemCollector::new("/", "127.0.0.1");
        collector.refresh().await.unwrap();

        let cpu = collector.details(METRIC_CPU).unwrap();
        assert_eq!(
            cpu["cores"].as_u64().unwrap() as usize,
            cpu["per_core_usage"].as_array().unwrap().len()
        );
        assert!(collector.details(METRIC_RAM).unwrap()["total"].is_u64());
        assert!(collector.details(METRIC_DISK).unwrap()["partitions"].is_array());
        assert!(collector.details(METRIC_NETWORK).unwrap()["packets_received"].is_u64());
        assert!(collector.details(METRIC_DISK_READ_SPEED).is_none());
    }

    #[tokio::test]
    async fn test_disk_rates_after_refresh() {
        let mut collector = SystemCollector::new("/", "127.0.0.1");
        tokio::time::sleep(Duration::from_millis(20)).await;
        collector.refresh().await.unwrap();

        let read = collector.sample(METRIC_DISK_READ_SPEED).await.unwrap();
        let write = collector.sample(METRIC_DISK_WRITE_SPEED).await.unwrap();
        assert!(read >= 0.0 && read.is_finite());
        assert!(write >= 0.0 && write.is_finite());
    }
}

use anyhow::{anyhow, bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use hwmon_types::MAX_COOLDOWN_MINUTES;
use std::path::{Path, PathBuf};

use crate::AppConfig;

/// 默认的环境变量前缀，例如 `HWMON__MONITOR__INTERVAL_SECS=10`
pub const ENV_PREFIX: &str = "HWMON";

/// 配置加载器
///
/// 文件不存在时使用默认配置，环境变量覆盖文件中的值。
pub struct ConfigLoader {
    config_path: PathBuf,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            env_prefix: Some(ENV_PREFIX.to_string()),
        }
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// 加载并校验配置，返回配置和非致命的警告
    pub fn load(&self) -> Result<(AppConfig, Vec<String>)> {
        let mut builder = Config::builder();

        if self.config_path.exists() {
            builder = builder.add_source(File::new(
                self.config_path
                    .to_str()
                    .ok_or_else(|| anyhow!("Invalid config path"))?,
                FileFormat::Toml,
            ));
        }

        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: AppConfig = builder
            .build()?
            .try_deserialize()
            .with_context(|| format!("Failed to parse config {:?}", self.config_path))?;

        let warnings = Self::validate(&config)?;
        Ok((config, warnings))
    }

    /// 校验配置
    pub fn validate(config: &AppConfig) -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        if config.monitor.interval_secs == 0 {
            bail!("monitor.interval_secs must be greater than 0");
        }

        if config.monitor.history_capacity == 0 {
            bail!("monitor.history_capacity must be greater than 0");
        }

        if config.monitor.sink_timeout_ms == 0 {
            bail!("monitor.sink_timeout_ms must be greater than 0");
        }

        if !config.cooldown.is_valid() {
            bail!(
                "cooldown minutes must be between 0 and {} (warning = {}, critical = {})",
                MAX_COOLDOWN_MINUTES,
                config.cooldown.warning_minutes,
                config.cooldown.critical_minutes
            );
        }

        for (metric, entry) in &config.thresholds {
            if !entry.warning.is_finite() || !entry.critical.is_finite() {
                bail!("thresholds.{} must be finite numbers", metric);
            }

            let spec = entry.to_spec(metric);
            if !spec.is_ordered() {
                bail!(
                    "thresholds.{}: warning ({}) and critical ({}) are out of order for polarity {:?}",
                    metric,
                    entry.warning,
                    entry.critical,
                    entry.polarity
                );
            }

            if !config.monitor.metrics.contains(metric) {
                warnings.push(format!(
                    "thresholds.{} is configured but the metric is not sampled",
                    metric
                ));
            }
        }

        Ok(warnings)
    }

    /// 默认配置的 TOML 文本
    pub fn render_default() -> Result<String> {
        Ok(toml::to_string_pretty(&AppConfig::default())?)
    }
}

use thiserror::Error;

/// 监控核心统一错误类型
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Collection error: {0}")]
    Collection(String),

    #[error("Sink error ({sink}): {reason}")]
    Sink { sink: String, reason: String },

    #[error("Sink {sink} timed out after {timeout_ms} ms")]
    Timeout { sink: String, timeout_ms: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MonitorError {
    pub fn sink(sink: impl Into<String>, reason: impl ToString) -> Self {
        MonitorError::Sink {
            sink: sink.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, MonitorError::Timeout { .. })
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, MonitorError>;

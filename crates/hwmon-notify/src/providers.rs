use crate::message::{NotifyLevel, NotifyMessage};
use crate::notifier::{Notifier, NotifyResult};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Pushbullet 推送
// ============================================================================

pub const PUSHBULLET_API_URL: &str = "https://api.pushbullet.com/v2/pushes";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushbulletConfig {
    pub access_token: String,
    #[serde(default = "default_pushbullet_url")]
    pub api_url: String,
}

fn default_pushbullet_url() -> String {
    PUSHBULLET_API_URL.to_string()
}

impl PushbulletConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            api_url: default_pushbullet_url(),
        }
    }
}

pub struct PushbulletNotifier {
    config: PushbulletConfig,
    client: reqwest::Client,
    enabled: bool,
}

impl PushbulletNotifier {
    pub fn new(config: PushbulletConfig) -> Self {
        let enabled = !config.access_token.is_empty();
        Self {
            config,
            client: reqwest::Client::new(),
            enabled,
        }
    }

    fn build_note(&self, message: &NotifyMessage) -> serde_json::Value {
        serde_json::json!({
            "type": "note",
            "title": message.title,
            "body": message.body,
        })
    }
}

#[async_trait]
impl Notifier for PushbulletNotifier {
    async fn send(&self, message: &NotifyMessage) -> Result<NotifyResult> {
        let response = self
            .client
            .post(&self.config.api_url)
            .header("Access-Token", &self.config.access_token)
            .json(&self.build_note(message))
            .send()
            .await?;

        Ok(status_result(self.name(), response.status()))
    }

    fn name(&self) -> &str {
        "pushbullet"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// HTTP 状态码转成通知结果；非 2xx 视为失败，不重试
fn status_result(provider: &str, status: reqwest::StatusCode) -> NotifyResult {
    if status.is_success() {
        NotifyResult::success()
    } else {
        NotifyResult::failure(format!("{} rejected the push: HTTP {}", provider, status))
    }
}

/// 告警元数据中的字段，没有时为空字符串
fn metadata_field(message: &NotifyMessage, key: &str) -> String {
    message
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.get(key))
        .map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default()
}

// ============================================================================
// 通用 Webhook：原样 POST 整条 NotifyMessage
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

pub struct WebhookNotifier {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &NotifyMessage) -> Result<NotifyResult> {
        let request = self
            .config
            .headers
            .iter()
            .fold(self.client.post(&self.config.url), |request, (key, value)| {
                request.header(key, value)
            });

        let response = request.json(message).send().await?;
        Ok(status_result(self.name(), response.status()))
    }

    fn name(&self) -> &str {
        "webhook"
    }

    fn is_enabled(&self) -> bool {
        !self.config.url.is_empty()
    }
}

// ============================================================================
// Slack incoming webhook
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
}

pub struct SlackNotifier {
    config: SlackConfig,
    client: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(config: SlackConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn build_message(&self, message: &NotifyMessage) -> serde_json::Value {
        let color = match message.level {
            NotifyLevel::Info => "good",
            NotifyLevel::Warning => "warning",
            NotifyLevel::Critical => "danger",
        };

        serde_json::json!({
            "text": message.title,
            "attachments": [{
                "color": color,
                "text": message.body,
                "fields": [
                    { "title": "Metric", "value": metadata_field(message, "metric_id"), "short": true },
                    { "title": "Repeat", "value": metadata_field(message, "notification_count"), "short": true }
                ],
                "ts": message.timestamp.timestamp(),
            }]
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, message: &NotifyMessage) -> Result<NotifyResult> {
        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&self.build_message(message))
            .send()
            .await?;

        Ok(status_result(self.name(), response.status()))
    }

    fn name(&self) -> &str {
        "slack"
    }

    fn is_enabled(&self) -> bool {
        !self.config.webhook_url.is_empty()
    }
}

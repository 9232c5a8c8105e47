//! Failure alerting — posts error notifications to a webhook.

use async_trait::async_trait;

use crate::error::AlertError;

/// Sink for human-readable failure notifications.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, content: &str) -> Result<(), AlertError>;
}

/// Posts `{"content": ...}` to a Discord-compatible webhook URL.
pub struct WebhookAlerter {
    http: reqwest::Client,
    url: String,
}

impl WebhookAlerter {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    fn payload(content: &str) -> serde_json::Value {
        serde_json::json!({ "content": content })
    }
}

#[async_trait]
impl AlertSink for WebhookAlerter {
    async fn notify(&self, content: &str) -> Result<(), AlertError> {
        self.http
            .post(&self.url)
            .json(&Self::payload(content))
            .send()
            .await
            .map_err(|e| AlertError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| AlertError::Request(e.to_string()))?;
        Ok(())
    }
}

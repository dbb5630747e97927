use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::notify::Notifier;

/// Webhook delivery configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    /// Upper bound for a single delivery attempt
    pub timeout: Duration,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Posts `{"text": message}` to an incoming webhook
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) -> bool {
        let result = self
            .client
            .post(&self.config.url)
            .json(&WebhookPayload { text: message })
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Notification delivered ({})", response.status());
                true
            }
            Ok(response) => {
                warn!(
                    "❌ Problem sending notification: webhook returned {}",
                    response.status()
                );
                false
            }
            Err(e) => {
                warn!("❌ Problem sending notification: {}", e);
                false
            }
        }
    }
}

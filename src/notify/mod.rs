// Notification delivery
//
// Webhook: Slack-style incoming webhook, JSON body {"text": ...}
// Dry run: prints the message instead of sending it
pub mod webhook;

use async_trait::async_trait;
use tracing::info;

pub use webhook::{WebhookConfig, WebhookNotifier};

/// Delivers one message to an external channel.
///
/// Transport failures are never surfaced as errors: implementations log the
/// cause and return `false` so the poll cycle can stop and retry later.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> bool;
}

/// Prints messages and always reports success
pub struct DryRunNotifier {
    target: String,
}

impl DryRunNotifier {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

#[async_trait]
impl Notifier for DryRunNotifier {
    async fn notify(&self, message: &str) -> bool {
        info!("📝 Dry run, not sending notification");
        println!("Will send this message '{}' to {}", message, self.target);
        true
    }
}

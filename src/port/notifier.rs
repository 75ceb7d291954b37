//! Notification port (§1, §6): a single outbound `send(string)`. Sinks
//! (chat, e-mail) are out of scope for the core; this module defines the
//! trait plus one sample HTTP-webhook implementation so the engine has a
//! concrete realization to run against in non-test configurations.

use async_trait::async_trait;
use tracing::warn;

use crate::error::Error;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), Error>;
}

/// Posts `{"text": message}` to a configured webhook URL (Slack-compatible
/// incoming-webhook shape). Failures are logged, not propagated — a
/// notification is best-effort and must never abort command execution
/// (§1: notifier is a one-way outbound collaborator).
pub struct HttpNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl HttpNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, message: &str) -> Result<(), Error> {
        let body = serde_json::json!({ "text": message });
        if let Err(e) = self.client.post(&self.webhook_url).json(&body).send().await {
            warn!(error = %e, "notifier webhook post failed");
        }
        Ok(())
    }
}

/// Writes notifications to the log at `info` level. Used when no webhook is
/// configured.
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(&self, message: &str) -> Result<(), Error> {
        tracing::info!(notification = message, "notify");
        Ok(())
    }
}

use crate::error::{Result, SyncError};
use reqwest::blocking::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Delivers plain-text messages about completed actions.
pub trait Notifier {
    fn notify(&self, text: &str) -> Result<()>;
}

/// Incoming-webhook message body (`{"text": "..."}`).
#[derive(Debug, Serialize)]
struct Message<'a> {
    text: &'a str,
}

/// Posts messages to a Slack-compatible incoming webhook
pub struct WebhookNotifier {
    client: Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(url: Url, timeout: Option<Duration>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("modsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, url })
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, text: &str) -> Result<()> {
        debug!(text, "Posting webhook message");
        let response = self
            .client
            .post(self.url.clone())
            .json(&Message { text })
            .send()
            .map_err(|e| SyncError::Notification(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SyncError::Notification(format!(
                "Webhook returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Used when no webhook is configured; messages only reach the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, text: &str) -> Result<()> {
        info!(text, "No webhook configured, skipping notification");
        Ok(())
    }
}

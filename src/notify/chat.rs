// src/notify/chat.rs
use anyhow::{Context, Result};
use reqwest::Client;

use super::{alert_message, AlertSink, SINK_TIMEOUT};
use crate::signals::Signal;

/// Slack / Discord / Telegram style incoming webhook taking `{"text": ..}`.
pub struct ChatWebhookNotifier {
    webhook_url: String,
    client: Client,
}

impl ChatWebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: crate::http::client(SINK_TIMEOUT),
        }
    }
}

#[async_trait::async_trait]
impl AlertSink for ChatWebhookNotifier {
    async fn send_signals(&self, signals: &[Signal]) -> Result<()> {
        let body = serde_json::json!({ "text": alert_message(signals) });

        self.client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .context("chat webhook post")?
            .error_for_status()
            .context("chat webhook non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "chat_webhook"
    }
}

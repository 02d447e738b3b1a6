// src/notify/webhook.rs
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;

use super::{AlertSink, SINK_TIMEOUT};
use crate::signals::Signal;

/// `{"type": "signals_alert", "signals": [...]}`
#[derive(Debug, Serialize)]
pub struct SignalsAlert<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub signals: &'a [Signal],
}

impl<'a> SignalsAlert<'a> {
    pub fn new(signals: &'a [Signal]) -> Self {
        Self {
            kind: "signals_alert",
            signals,
        }
    }
}

/// Generic JSON webhook (`ALERT_WEBHOOK_URL`).
pub struct WebhookAlerter {
    url: String,
    client: Client,
}

impl WebhookAlerter {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: crate::http::client(SINK_TIMEOUT),
        }
    }
}

#[async_trait::async_trait]
impl AlertSink for WebhookAlerter {
    async fn send_signals(&self, signals: &[Signal]) -> Result<()> {
        self.client
            .post(&self.url)
            .json(&SignalsAlert::new(signals))
            .send()
            .await
            .context("alert webhook post")?
            .error_for_status()
            .context("alert webhook non-2xx")?;
        tracing::info!(count = signals.len(), "signals alert delivered");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_shape() {
        let v = serde_json::to_value(SignalsAlert::new(&[])).unwrap();
        assert_eq!(v, serde_json::json!({"type": "signals_alert", "signals": []}));
    }
}

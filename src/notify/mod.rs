// src/notify/mod.rs
//! Outbound alert sinks. Best-effort, at most once, no retries.

pub mod chat;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures_util::future::join_all;

use crate::config::Settings;
use crate::signals::Signal;

pub use chat::ChatWebhookNotifier;
pub use webhook::WebhookAlerter;

/// Per-sink delivery bound.
pub const SINK_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_signals(&self, signals: &[Signal]) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Human-readable one-liner per signal, used by chat sinks.
pub fn alert_message(signals: &[Signal]) -> String {
    let lines: Vec<String> = signals
        .iter()
        .map(|s| {
            format!(
                "{} {} ({:.0}% conf, score {:.2}, {} items)",
                s.ticker,
                s.kind.as_str().to_uppercase(),
                s.confidence * 100.0,
                s.score,
                s.evidence_count
            )
        })
        .collect();
    format!("*MarketSentinel alert*\n{}", lines.join("\n"))
}

/// Fan-out to every configured sink. Individual failures are logged;
/// the call fails only when every sink failed.
pub struct NotifierMux {
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl NotifierMux {
    pub fn new(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        Self { sinks }
    }

    /// JSON webhook plus chat webhooks from settings. `None` when nothing
    /// is configured, which disables alerting entirely.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let mut sinks: Vec<Arc<dyn AlertSink>> = Vec::new();
        if let Some(url) = &settings.alert_webhook_url {
            sinks.push(Arc::new(WebhookAlerter::new(url.clone())));
        }
        for url in &settings.chat_webhooks {
            sinks.push(Arc::new(ChatWebhookNotifier::new(url.clone())));
        }
        (!sinks.is_empty()).then(|| Self::new(sinks))
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait::async_trait]
impl AlertSink for NotifierMux {
    async fn send_signals(&self, signals: &[Signal]) -> Result<()> {
        let results = join_all(self.sinks.iter().map(|s| s.send_signals(signals))).await;
        let mut failed = 0usize;
        for (sink, res) in self.sinks.iter().zip(results) {
            if let Err(e) = res {
                failed += 1;
                tracing::warn!(sink = sink.name(), error = ?e, "alert delivery failed");
            }
        }
        if failed > 0 && failed == self.sinks.len() {
            return Err(anyhow!("all {failed} alert sinks failed"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mux"
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Records every delivery; optionally fails.
    #[derive(Default)]
    pub struct RecordingSink {
        pub sent: Mutex<Vec<Vec<Signal>>>,
        pub fail: bool,
    }

    #[async_trait::async_trait]
    impl AlertSink for RecordingSink {
        async fn send_signals(&self, signals: &[Signal]) -> Result<()> {
            self.sent.lock().push(signals.to_vec());
            if self.fail {
                Err(anyhow!("sink down"))
            } else {
                Ok(())
            }
        }
        fn name(&self) -> &'static str {
            "recording"
        }
    }
}

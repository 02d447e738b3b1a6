// src/ingest/providers/slack.rs
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{gather_per_ticker, unix_to_rfc3339};
use crate::ingest::types::{RawItem, SourceKind, SourceProvider};

const SEARCH_URL: &str = "https://slack.com/api/search.messages";

#[derive(Debug, Deserialize)]
struct SearchResp {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Option<Messages>,
}

#[derive(Debug, Deserialize)]
struct Messages {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct Match {
    #[serde(default)]
    text: String,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    channel: Option<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    name: String,
}

/// Slack `search.messages`, restricted to one channel. Without a token the
/// adapter returns nothing rather than failing.
pub struct SlackProvider {
    client: reqwest::Client,
    token: Option<String>,
    channel: String,
}

impl SlackProvider {
    pub fn new(token: Option<String>, channel: String, timeout: Duration) -> Self {
        Self {
            client: crate::http::client(timeout),
            token,
            channel,
        }
    }

    async fn fetch_ticker(&self, token: &str, ticker: &str) -> Result<Vec<RawItem>> {
        let resp: SearchResp = self
            .client
            .get(SEARCH_URL)
            .bearer_auth(token)
            .query(&[("query", ticker), ("count", "20"), ("sort", "timestamp")])
            .send()
            .await
            .context("slack get()")?
            .error_for_status()
            .context("slack non-2xx")?
            .json()
            .await
            .context("slack json")?;
        response_to_items(resp, &self.channel)
    }
}

fn response_to_items(resp: SearchResp, channel: &str) -> Result<Vec<RawItem>> {
    if !resp.ok {
        return Err(anyhow!(
            "slack api error: {}",
            resp.error.unwrap_or_else(|| "unknown".into())
        ));
    }
    Ok(resp
        .messages
        .map(|m| m.matches)
        .unwrap_or_default()
        .into_iter()
        .filter(|m| m.channel.as_ref().is_some_and(|c| c.name == channel))
        .filter(|m| !m.text.trim().is_empty())
        .map(|m| {
            let mut item = RawItem::new(SourceKind::Chat, "slack", m.text);
            item.url = m.permalink;
            item.timestamp = m
                .ts
                .as_deref()
                .and_then(|ts| ts.split('.').next())
                .and_then(|s| s.parse::<i64>().ok())
                .and_then(unix_to_rfc3339);
            item
        })
        .collect())
}

#[async_trait]
impl SourceProvider for SlackProvider {
    async fn fetch_raw(&self, tickers: &[String]) -> Result<Vec<RawItem>> {
        let Some(token) = self.token.as_deref() else {
            return Ok(Vec::new());
        };
        gather_per_ticker("slack", tickers, |t| self.fetch_ticker(token, t)).await
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}

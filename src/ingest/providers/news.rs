// src/ingest/providers/news.rs
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::{gather_per_ticker, rss};
use crate::ingest::types::{RawItem, SourceKind, SourceProvider};

/// Per-ticker Google News RSS headlines (`"<TICKER> stock"`).
pub struct NewsProvider {
    client: reqwest::Client,
    max_per_ticker: usize,
}

impl NewsProvider {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: crate::http::client(timeout),
            max_per_ticker: 10,
        }
    }

    pub fn with_max_per_ticker(mut self, max: usize) -> Self {
        self.max_per_ticker = max;
        self
    }

    async fn fetch_ticker(&self, ticker: &str) -> Result<Vec<RawItem>> {
        let query = format!("{ticker} stock");
        let articles = rss::fetch_google_news(&self.client, &query, self.max_per_ticker).await?;
        Ok(articles
            .into_iter()
            .map(|a| a.into_raw(SourceKind::News, "news"))
            .collect())
    }
}

#[async_trait]
impl SourceProvider for NewsProvider {
    async fn fetch_raw(&self, tickers: &[String]) -> Result<Vec<RawItem>> {
        gather_per_ticker("news", tickers, |t| self.fetch_ticker(t)).await
    }

    fn name(&self) -> &'static str {
        "news"
    }
}

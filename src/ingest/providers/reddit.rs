// src/ingest/providers/reddit.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{gather_per_ticker, unix_to_rfc3339};
use crate::ingest::types::{RawItem, SourceKind, SourceProvider};

const SEARCH_URL: &str = "https://www.reddit.com/search.json";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    created_utc: Option<f64>,
}

/// Public Reddit search, one query per ticker, newest first.
pub struct RedditProvider {
    client: reqwest::Client,
    limit: usize,
}

impl RedditProvider {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: crate::http::client(timeout),
            limit: 25,
        }
    }

    async fn fetch_ticker(&self, ticker: &str) -> Result<Vec<RawItem>> {
        let limit = self.limit.to_string();
        let listing: Listing = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", ticker), ("sort", "new"), ("limit", limit.as_str())])
            .send()
            .await
            .context("reddit get()")?
            .error_for_status()
            .context("reddit non-2xx")?
            .json()
            .await
            .context("reddit json")?;
        Ok(listing_to_items(listing))
    }
}

fn listing_to_items(listing: Listing) -> Vec<RawItem> {
    listing
        .data
        .children
        .into_iter()
        .map(|c| {
            let p = c.data;
            let text = format!("{} {}", p.title, p.selftext).trim().to_string();
            let mut item = RawItem::new(SourceKind::Social, "reddit", text).with_title(p.title);
            item.url = p.permalink.map(|l| format!("https://www.reddit.com{l}"));
            item.timestamp = p.created_utc.and_then(|s| unix_to_rfc3339(s as i64));
            item
        })
        .collect()
}

#[async_trait]
impl SourceProvider for RedditProvider {
    async fn fetch_raw(&self, tickers: &[String]) -> Result<Vec<RawItem>> {
        gather_per_ticker("reddit", tickers, |t| self.fetch_ticker(t)).await
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_maps_title_and_body() {
        let listing: Listing = serde_json::from_str(
            r#"{"data":{"children":[
                {"data":{"title":"TSLA earnings","selftext":"margins look weak","permalink":"/r/stocks/x","created_utc":1700000000.0}},
                {"data":{"title":"MSFT","selftext":""}}
            ]}}"#,
        )
        .unwrap();
        let items = listing_to_items(listing);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text, "TSLA earnings margins look weak");
        assert_eq!(items[0].url.as_deref(), Some("https://www.reddit.com/r/stocks/x"));
        assert_eq!(items[1].text, "MSFT");
        assert!(items[1].timestamp.is_none());
    }
}

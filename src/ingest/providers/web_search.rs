// src/ingest/providers/web_search.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::rss;
use crate::ingest::types::{RawItem, SourceKind};

const GOOGLE_CSE_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// One web search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

impl SearchHit {
    pub fn into_raw(self) -> RawItem {
        let text = format!("{} {}", self.title, self.snippet).trim().to_string();
        RawItem::new(SourceKind::Search, "web", text)
            .with_title(self.title)
            .with_url(self.url)
    }
}

/// Web search passthrough plus free-form news lookup.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, max: usize) -> Result<Vec<SearchHit>>;
    async fn news_by_query(&self, query: &str, max: usize) -> Result<Vec<RawItem>>;
    fn provider(&self) -> &'static str;
}

/// Google Custom Search when keyed, Google News RSS otherwise (and on CSE failure).
pub struct GoogleSearch {
    client: reqwest::Client,
    api_key: Option<String>,
    cse_id: Option<String>,
}

impl GoogleSearch {
    pub fn new(api_key: Option<String>, cse_id: Option<String>, timeout: Duration) -> Self {
        Self {
            client: crate::http::client(timeout),
            api_key,
            cse_id,
        }
    }

    async fn search_cse(&self, key: &str, cx: &str, query: &str, max: usize) -> Result<Vec<SearchHit>> {
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            items: Vec<CseItem>,
        }
        #[derive(Deserialize)]
        struct CseItem {
            title: String,
            link: String,
            #[serde(default)]
            snippet: String,
        }

        let num = max.clamp(1, 10).to_string();
        let resp: Resp = self
            .client
            .get(GOOGLE_CSE_URL)
            .query(&[("q", query), ("key", key), ("cx", cx), ("num", num.as_str())])
            .send()
            .await
            .context("cse get()")?
            .error_for_status()
            .context("cse non-2xx")?
            .json()
            .await
            .context("cse json")?;

        Ok(resp
            .items
            .into_iter()
            .map(|it| SearchHit {
                title: it.title,
                url: it.link,
                snippet: it.snippet,
            })
            .collect())
    }

    async fn search_rss(&self, query: &str, max: usize) -> Result<Vec<SearchHit>> {
        let articles = rss::fetch_google_news(&self.client, query, max).await?;
        Ok(articles
            .into_iter()
            .map(|a| SearchHit {
                title: a.title,
                url: a.url,
                snippet: a.summary,
            })
            .collect())
    }
}

#[async_trait]
impl WebSearch for GoogleSearch {
    async fn search(&self, query: &str, max: usize) -> Result<Vec<SearchHit>> {
        if let (Some(key), Some(cx)) = (&self.api_key, &self.cse_id) {
            match self.search_cse(key, cx, query, max).await {
                Ok(hits) => return Ok(hits),
                Err(e) => tracing::warn!(error = ?e, "web search failed; falling back to news rss"),
            }
        }
        self.search_rss(query, max).await
    }

    async fn news_by_query(&self, query: &str, max: usize) -> Result<Vec<RawItem>> {
        let articles = rss::fetch_google_news(&self.client, query, max).await?;
        Ok(articles
            .into_iter()
            .map(|a| a.into_raw(SourceKind::News, "news"))
            .collect())
    }

    fn provider(&self) -> &'static str {
        "google"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_converts_to_search_item() {
        let raw = SearchHit {
            title: "TSLA deliveries".into(),
            url: "https://example.test/t".into(),
            snippet: "beat consensus".into(),
        }
        .into_raw();
        assert_eq!(raw.source, SourceKind::Search);
        assert_eq!(raw.text, "TSLA deliveries beat consensus");
        assert_eq!(raw.title.as_deref(), Some("TSLA deliveries"));
    }
}

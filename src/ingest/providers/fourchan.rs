// src/ingest/providers/fourchan.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{rss::strip_html, unix_to_rfc3339};
use crate::ingest::types::{RawItem, SourceKind, SourceProvider};

const API_BASE: &str = "https://a.4cdn.org";

#[derive(Debug, Deserialize)]
struct CatalogPage {
    #[serde(default)]
    threads: Vec<CatalogThread>,
}

#[derive(Debug, Deserialize)]
struct CatalogThread {
    no: u64,
}

#[derive(Debug, Deserialize)]
struct Thread {
    #[serde(default)]
    posts: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    no: u64,
    #[serde(default)]
    com: Option<String>,
    #[serde(default)]
    time: Option<i64>,
}

/// Posts from the first catalog page of a board (default `/biz/`).
/// Tickers are ignored: the aggregator does the matching.
pub struct ForumProvider {
    client: reqwest::Client,
    board: String,
    max_threads: usize,
}

impl ForumProvider {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: crate::http::client(timeout),
            board: "biz".to_string(),
            max_threads: 10,
        }
    }

    async fn thread_ids(&self) -> Result<Vec<u64>> {
        let url = format!("{API_BASE}/{}/catalog.json", self.board);
        let pages: Vec<CatalogPage> = self
            .client
            .get(&url)
            .send()
            .await
            .context("catalog get()")?
            .error_for_status()
            .context("catalog non-2xx")?
            .json()
            .await
            .context("catalog json")?;

        Ok(pages
            .into_iter()
            .next()
            .map(|p| p.threads.into_iter().map(|t| t.no).take(self.max_threads).collect())
            .unwrap_or_default())
    }

    async fn thread_posts(&self, no: u64) -> Result<Vec<RawItem>> {
        let url = format!("{API_BASE}/{}/thread/{no}.json", self.board);
        let thread: Thread = self
            .client
            .get(&url)
            .send()
            .await
            .context("thread get()")?
            .error_for_status()
            .context("thread non-2xx")?
            .json()
            .await
            .context("thread json")?;

        let link = format!("https://boards.4chan.org/{}/thread/{no}", self.board);
        Ok(posts_to_items(thread.posts, &link))
    }
}

fn posts_to_items(posts: Vec<Post>, link: &str) -> Vec<RawItem> {
    posts
        .into_iter()
        .filter_map(|p| {
            let text = strip_html(p.com.as_deref()?);
            if text.is_empty() {
                return None;
            }
            let mut item = RawItem::new(SourceKind::Forum, "4chan", text)
                .with_url(format!("{link}#p{}", p.no));
            item.timestamp = p.time.and_then(unix_to_rfc3339);
            Some(item)
        })
        .collect()
}

#[async_trait]
impl SourceProvider for ForumProvider {
    async fn fetch_raw(&self, _tickers: &[String]) -> Result<Vec<RawItem>> {
        let ids = self.thread_ids().await?;
        let mut out = Vec::new();
        for no in ids {
            match self.thread_posts(no).await {
                Ok(mut items) => out.append(&mut items),
                Err(e) => tracing::debug!(thread = no, error = ?e, "skipping thread"),
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "4chan"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posts_without_comment_are_skipped() {
        let thread: Thread = serde_json::from_str(
            r#"{"posts":[
                {"no":1,"com":"$AAPL to the moon<br>buy now","time":1700000000},
                {"no":2,"time":1700000100},
                {"no":3,"com":"<span></span>"}
            ]}"#,
        )
        .unwrap();
        let items = posts_to_items(thread.posts, "https://boards.4chan.org/biz/thread/1");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, SourceKind::Forum);
        assert!(items[0].text.contains("AAPL to the moon"));
        assert!(!items[0].text.contains("<br>"));
        assert_eq!(items[0].url.as_deref(), Some("https://boards.4chan.org/biz/thread/1#p1"));
        assert_eq!(items[0].timestamp.as_deref(), Some("2023-11-14T22:13:20Z"));
    }
}

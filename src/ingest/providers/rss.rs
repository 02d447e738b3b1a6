// src/ingest/providers/rss.rs
//! Google News RSS parsing shared by the news adapter and the web-search fallback.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};

use crate::ingest::types::{RawItem, SourceKind};

const GOOGLE_NEWS_RSS: &str = "https://news.google.com/rss/search";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// One feed entry, HTML already stripped.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub published: Option<String>,
    pub summary: String,
}

impl Article {
    pub fn into_raw(self, source: SourceKind, origin: &str) -> RawItem {
        let text = format!("{} {}", self.title, self.summary).trim().to_string();
        let mut item = RawItem::new(source, origin, text)
            .with_title(self.title)
            .with_url(self.url);
        item.timestamp = self.published;
        item
    }
}

fn rfc2822_to_rfc3339(ts: &str) -> Option<String> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC))
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

/// Decode entities and drop tags from an HTML fragment.
pub(crate) fn strip_html(s: &str) -> String {
    static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    static RE_BR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("br regex"));
    let decoded = html_escape::decode_html_entities(s).to_string();
    let spaced = RE_BR.replace_all(&decoded, " ");
    RE_TAGS.replace_all(&spaced, " ").trim().to_string()
}

/// Parse an RSS document, keeping at most `max` entries.
pub fn parse_feed(xml: &str, max: usize) -> Result<Vec<Article>> {
    let rss: Rss = from_str(&scrub_html_entities_for_xml(xml)).context("parsing rss xml")?;
    Ok(rss
        .channel
        .item
        .into_iter()
        .take(max)
        .map(|it| Article {
            title: strip_html(it.title.as_deref().unwrap_or_default()),
            url: it.link.unwrap_or_default(),
            published: it.pub_date.as_deref().and_then(rfc2822_to_rfc3339),
            summary: strip_html(it.description.as_deref().unwrap_or_default()),
        })
        .collect())
}

/// Free-form Google News search.
pub async fn fetch_google_news(
    client: &reqwest::Client,
    query: &str,
    max: usize,
) -> Result<Vec<Article>> {
    let body = client
        .get(GOOGLE_NEWS_RSS)
        .query(&[("q", query), ("hl", "en-US"), ("gl", "US"), ("ceid", "US:en")])
        .send()
        .await
        .context("google news get()")?
        .error_for_status()
        .context("google news non-2xx")?
        .text()
        .await
        .context("google news .text()")?;
    parse_feed(&body, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>news</title>
<item>
  <title>Apple beats estimates &amp; raises guidance</title>
  <link>https://example.test/a</link>
  <pubDate>Tue, 14 Oct 2025 13:05:00 +0000</pubDate>
  <description>&lt;a href="x"&gt;Apple&lt;/a&gt;&nbsp;shares jump</description>
</item>
<item>
  <title>Second</title>
  <link>https://example.test/b</link>
</item>
</channel></rss>"#;

    #[test]
    fn parses_items_and_strips_html() {
        let items = parse_feed(FEED, 10).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Apple beats estimates & raises guidance");
        assert!(items[0].summary.starts_with("Apple"));
        assert!(items[0].summary.ends_with("shares jump"));
        assert_eq!(items[0].published.as_deref(), Some("2025-10-14T13:05:00Z"));
        assert!(items[1].published.is_none());
    }

    #[test]
    fn max_limits_entries() {
        assert_eq!(parse_feed(FEED, 1).unwrap().len(), 1);
    }

    #[test]
    fn article_becomes_titled_raw_item() {
        let raw = parse_feed(FEED, 1).unwrap().remove(0).into_raw(SourceKind::News, "news");
        assert_eq!(raw.title.as_deref(), Some("Apple beats estimates & raises guidance"));
        assert!(raw.text.starts_with("Apple beats estimates"));
        assert_eq!(raw.url.as_deref(), Some("https://example.test/a"));
    }
}

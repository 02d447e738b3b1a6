// src/api/feed.rs
//! Feed listing: cached news with tiered fallback, optionally mixed with
//! pipeline-scored items.

use std::cmp::Reverse;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use super::dto::{FeedItem, FeedSentiment, TrustScore};
use super::AppState;
use crate::cache::NEWS_KEY;
use crate::ingest::{self, types::RawItem};
use crate::signals::TickerMatchers;

pub const MAX_FEED_TICKERS: usize = 6;
const FALLBACK_PER_TICKER: usize = 5;
const GENERAL_QUERIES: [&str; 3] = ["stock market", "finance news", "global markets"];
const TITLE_CHARS: usize = 120;
const SUMMARY_CHARS: usize = 240;

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn prefix(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Frontend filter keys for adapter origins.
pub fn normalize_source(origin: &str) -> String {
    match origin.to_ascii_lowercase().as_str() {
        "x.com" | "x" | "twitter" | "tweet" => "twitter".to_string(),
        "yt" | "youtube" | "video" => "youtube".to_string(),
        "reddit" | "r/" => "reddit".to_string(),
        other => other.to_string(),
    }
}

/// Comma separated list, blanks dropped, capped at [`MAX_FEED_TICKERS`].
/// `None` or an empty list means the tracked defaults.
pub fn parse_tickers(raw: Option<&str>, defaults: &[String]) -> Vec<String> {
    let parsed: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    let list = if parsed.is_empty() { defaults.to_vec() } else { parsed };
    list.into_iter().take(MAX_FEED_TICKERS).collect()
}

fn news_item(raw: RawItem, matchers: &TickerMatchers) -> FeedItem {
    let title = raw.title.clone().unwrap_or_default();
    let summary = raw
        .text
        .strip_prefix(title.as_str())
        .unwrap_or(raw.text.as_str())
        .trim()
        .to_string();
    FeedItem {
        id: Uuid::new_v4(),
        source: "news".to_string(),
        entities: matchers.mentions(&raw.text),
        title,
        summary,
        sentiment: FeedSentiment::Neutral,
        confidence: 0.5,
        timestamp: raw.timestamp.unwrap_or_else(now_rfc3339),
        url: raw.url.unwrap_or_default(),
        trust_score: TrustScore::High,
    }
}

/// News tiers: cache (refreshed by a direct fetch), then per-ticker web
/// search, then generic market headlines.
async fn news_tiers(state: &AppState, tickers: &[String]) -> Vec<RawItem> {
    let timeout = state.settings.source_timeout;
    let cached = state
        .cache
        .get_or_refresh(NEWS_KEY, state.settings.news_cache_ttl, move || async move {
            match ingest::fetch_one(state.news.as_ref(), tickers, timeout).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(error = %e, "feed news fetch failed");
                    Vec::new()
                }
            }
        })
        .await;
    if !cached.is_empty() {
        return cached;
    }

    let mut fallback = Vec::new();
    for t in tickers {
        let query = format!("{t} stock latest");
        match state.web_search.search(&query, FALLBACK_PER_TICKER).await {
            Ok(hits) => fallback.extend(hits.into_iter().map(|h| {
                let mut raw = h.into_raw();
                raw.timestamp = Some(now_rfc3339());
                raw
            })),
            Err(e) => tracing::debug!(ticker = %t, error = ?e, "feed search fallback failed"),
        }
    }
    if !fallback.is_empty() {
        return fallback;
    }

    let mut general = Vec::new();
    for q in GENERAL_QUERIES {
        match state.web_search.news_by_query(q, FALLBACK_PER_TICKER).await {
            Ok(items) => general.extend(items),
            Err(e) => tracing::debug!(query = q, error = ?e, "general headlines failed"),
        }
    }
    general
}

pub async fn build_feed(state: &AppState, tickers: &[String], limit: usize, fast: bool) -> Vec<FeedItem> {
    let matchers = TickerMatchers::new(tickers);
    let news = news_tiers(state, tickers).await;
    let mut items: Vec<FeedItem> = news.into_iter().map(|n| news_item(n, &matchers)).collect();

    if !fast {
        let scored = state.pipeline.analyze(tickers).await;
        let now = now_rfc3339();
        items.extend(scored.into_iter().map(|s| {
            let title = prefix(s.text(), TITLE_CHARS);
            FeedItem {
                id: Uuid::new_v4(),
                source: normalize_source(&s.item.origin),
                title: if title.is_empty() { "Market item".to_string() } else { title },
                summary: prefix(s.text(), SUMMARY_CHARS),
                sentiment: FeedSentiment::from_score(s.sentiment),
                confidence: s.sentiment,
                timestamp: now.clone(),
                url: s.item.url.clone().unwrap_or_default(),
                entities: matchers.mentions(s.text()),
                trust_score: TrustScore::Medium,
            }
        }));
    }

    sort_newest_first(&mut items);
    items.truncate(limit);
    items
}

/// Adapters stamp with different RFC 3339 precisions, so order on the parsed
/// instant. Unparsable timestamps go last.
fn sort_newest_first(items: &mut [FeedItem]) {
    items.sort_by_cached_key(|i| {
        Reverse(
            DateTime::parse_from_rfc3339(&i.timestamp)
                .ok()
                .map(|d| d.with_timezone(&Utc)),
        )
    });
}

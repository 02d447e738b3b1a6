// src/ingest/providers/mod.rs
//! Concrete fetch adapters. Each is a thin HTTP call with its own auth quirks.

pub mod fourchan;
pub mod news;
pub mod reddit;
pub mod rss;
pub mod slack;
pub mod web_search;

use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::future::join_all;

use crate::config::Settings;
use crate::ingest::types::{RawItem, SourceProvider};

pub use fourchan::ForumProvider;
pub use news::NewsProvider;
pub use reddit::RedditProvider;
pub use slack::SlackProvider;
pub use web_search::{GoogleSearch, SearchHit, WebSearch};

/// The adapter set used by the streaming loops and the scoring endpoints.
pub fn default_providers(settings: &Settings) -> Vec<Box<dyn SourceProvider>> {
    vec![
        Box::new(ForumProvider::new(settings.source_timeout)),
        Box::new(RedditProvider::new(settings.source_timeout)),
        Box::new(SlackProvider::new(
            settings.slack_api_key.clone(),
            settings.slack_channel.clone(),
            settings.source_timeout,
        )),
        Box::new(NewsProvider::new(settings.source_timeout)),
    ]
}

/// Run `f` for every ticker concurrently. Fails only when every ticker failed.
pub(crate) async fn gather_per_ticker<'a, F, Fut>(
    provider: &'static str,
    tickers: &'a [String],
    f: F,
) -> Result<Vec<RawItem>>
where
    F: Fn(&'a str) -> Fut,
    Fut: Future<Output = Result<Vec<RawItem>>>,
{
    let results = join_all(tickers.iter().map(|t| f(t.as_str()))).await;

    let mut out = Vec::new();
    let mut ok = 0usize;
    let mut last_err = None;
    for res in results {
        match res {
            Ok(mut items) => {
                ok += 1;
                out.append(&mut items);
            }
            Err(e) => {
                tracing::debug!(provider, error = ?e, "per-ticker fetch failed");
                last_err = Some(e);
            }
        }
    }
    match last_err {
        Some(e) if ok == 0 => Err(e),
        _ => Ok(out),
    }
}

pub(crate) fn unix_to_rfc3339(secs: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

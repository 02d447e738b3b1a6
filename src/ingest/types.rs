// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Broad class of the place an item was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Forum,
    Social,
    Chat,
    News,
    Search,
}

/// Unprocessed text as returned by a fetch adapter. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub text: String,
    pub source: SourceKind,
    /// Adapter name, e.g. "reddit", "4chan", "news".
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// RFC 3339 when the upstream provides a publication time.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl RawItem {
    pub fn new(source: SourceKind, origin: &str, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source,
            origin: origin.to_string(),
            title: None,
            url: None,
            timestamp: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_timestamp(mut self, ts: impl Into<String>) -> Self {
        self.timestamp = Some(ts.into());
        self
    }
}

/// A `RawItem` whose text went through the cleaner: redacted, blocklist-free,
/// whitespace collapsed. Only `preproc::clean` constructs these.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CleanedItem(RawItem);

impl CleanedItem {
    pub(crate) fn from_cleaned(item: RawItem) -> Self {
        Self(item)
    }

    pub fn into_inner(self) -> RawItem {
        self.0
    }
}

impl Deref for CleanedItem {
    type Target = RawItem;

    fn deref(&self) -> &RawItem {
        &self.0
    }
}

/// Per-source fetch capability. Each call may fail independently; the
/// pipeline turns any error into "zero items from this source".
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_raw(&self, tickers: &[String]) -> Result<Vec<RawItem>>;
    fn name(&self) -> &'static str;
}

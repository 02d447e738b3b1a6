// src/store/supabase.rs
//! PostgREST persistence (`watchlists`, `watchlist_tickers`, `signals`).
//! Any remote failure falls back to the embedded [`MemoryStore`].

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{MemoryStore, WatchlistStore};
use crate::error::SentinelError;
use crate::signals::Signal;

pub struct SupabaseStore {
    client: Client,
    rest_url: String,
    key: String,
    fallback: MemoryStore,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: Value,
}

#[derive(Debug, Deserialize)]
struct TickerRow {
    ticker: String,
}

#[derive(Debug, Serialize)]
struct SignalRow<'a> {
    ticker: &'a str,
    signal_type: &'static str,
    score: f64,
    confidence: f64,
}

/// PostgREST `eq.` filter value for an id that may be numeric or a uuid.
fn id_filter(id: &Value) -> String {
    match id {
        Value::String(s) => format!("eq.{s}"),
        other => format!("eq.{other}"),
    }
}

impl SupabaseStore {
    pub fn new(url: &str, key: &str) -> Self {
        Self {
            client: crate::http::client(Duration::from_secs(10)),
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            key: key.to_string(),
            fallback: MemoryStore::new(),
        }
    }

    fn authed(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header("apikey", &self.key).bearer_auth(&self.key)
    }

    fn table(&self, name: &str) -> String {
        format!("{}/{name}", self.rest_url)
    }

    /// Find or create the user's single default watchlist.
    async fn ensure_watchlist(&self, user_id: &str) -> Result<Value> {
        let user_filter = format!("eq.{user_id}");
        let found: Vec<IdRow> = self
            .authed(self.client.get(self.table("watchlists")))
            .query(&[("select", "id"), ("user_id", user_filter.as_str()), ("limit", "1")])
            .send()
            .await
            .context("watchlists select")?
            .error_for_status()
            .context("watchlists select non-2xx")?
            .json()
            .await
            .context("watchlists json")?;
        if let Some(row) = found.into_iter().next() {
            return Ok(row.id);
        }

        let created: Vec<IdRow> = self
            .authed(self.client.post(self.table("watchlists")))
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "user_id": user_id, "name": "default" }))
            .send()
            .await
            .context("watchlists insert")?
            .error_for_status()
            .context("watchlists insert non-2xx")?
            .json()
            .await
            .context("watchlists insert json")?;
        created
            .into_iter()
            .next()
            .map(|r| r.id)
            .ok_or_else(|| anyhow!("watchlist insert returned no row"))
    }

    async fn tickers(&self, watchlist_id: &Value) -> Result<Vec<String>> {
        let filter = id_filter(watchlist_id);
        let rows: Vec<TickerRow> = self
            .authed(self.client.get(self.table("watchlist_tickers")))
            .query(&[("select", "ticker"), ("watchlist_id", filter.as_str())])
            .send()
            .await
            .context("tickers select")?
            .error_for_status()
            .context("tickers select non-2xx")?
            .json()
            .await
            .context("tickers json")?;
        Ok(rows.into_iter().map(|r| r.ticker).collect())
    }

    async fn try_load(&self, user_id: &str) -> Result<Vec<String>> {
        let id = self.ensure_watchlist(user_id).await?;
        self.tickers(&id).await
    }

    async fn try_add(&self, user_id: &str, ticker: &str) -> Result<Vec<String>> {
        let id = self.ensure_watchlist(user_id).await?;
        self.authed(self.client.post(self.table("watchlist_tickers")))
            .json(&serde_json::json!({ "watchlist_id": id, "ticker": ticker }))
            .send()
            .await
            .context("ticker insert")?
            .error_for_status()
            .context("ticker insert non-2xx")?;
        self.tickers(&id).await
    }

    async fn try_remove(&self, user_id: &str, ticker: &str) -> Result<Vec<String>> {
        let id = self.ensure_watchlist(user_id).await?;
        let id_eq = id_filter(&id);
        let ticker_eq = format!("eq.{ticker}");
        self.authed(self.client.delete(self.table("watchlist_tickers")))
            .query(&[("watchlist_id", id_eq.as_str()), ("ticker", ticker_eq.as_str())])
            .send()
            .await
            .context("ticker delete")?
            .error_for_status()
            .context("ticker delete non-2xx")?;
        self.tickers(&id).await
    }

    async fn try_store(&self, signals: &[Signal]) -> Result<()> {
        let rows: Vec<SignalRow<'_>> = signals
            .iter()
            .map(|s| SignalRow {
                ticker: &s.ticker,
                signal_type: s.kind.as_str(),
                score: s.score,
                confidence: s.confidence,
            })
            .collect();
        self.authed(self.client.post(self.table("signals")))
            .json(&rows)
            .send()
            .await
            .context("signals insert")?
            .error_for_status()
            .context("signals insert non-2xx")?;
        Ok(())
    }
}

fn degraded(op: &'static str, e: anyhow::Error) {
    let err = SentinelError::downstream(format!("supabase {op}: {e:#}"));
    tracing::warn!(error = %err, "falling back to in-memory store");
}

#[async_trait]
impl WatchlistStore for SupabaseStore {
    async fn load_watchlist(&self, user_id: &str) -> Vec<String> {
        match self.try_load(user_id).await {
            Ok(list) => list,
            Err(e) => {
                degraded("load_watchlist", e);
                self.fallback.get(user_id)
            }
        }
    }

    async fn add_ticker(&self, user_id: &str, ticker: &str) -> Vec<String> {
        match self.try_add(user_id, ticker).await {
            Ok(list) => list,
            Err(e) => {
                degraded("add_ticker", e);
                self.fallback.add(user_id, ticker)
            }
        }
    }

    async fn remove_ticker(&self, user_id: &str, ticker: &str) -> Vec<String> {
        match self.try_remove(user_id, ticker).await {
            Ok(list) => list,
            Err(e) => {
                degraded("remove_ticker", e);
                self.fallback.remove(user_id, ticker)
            }
        }
    }

    async fn store_signals(&self, signals: &[Signal]) {
        if signals.is_empty() {
            return;
        }
        if let Err(e) = self.try_store(signals).await {
            tracing::warn!(error = ?e, count = signals.len(), "store_signals failed");
        }
    }

    fn backend(&self) -> &'static str {
        "supabase"
    }
}

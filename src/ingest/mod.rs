// src/ingest/mod.rs
//! Fetch adapter set: concurrent, per-source bounded, fail-soft.

pub mod providers;
pub mod types;

use std::time::{Duration, Instant};

use futures_util::future::join_all;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;

use crate::error::{SentinelError, SentinelResult};
use crate::ingest::types::{RawItem, SourceProvider};

pub use types::{CleanedItem, SourceKind};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "pipeline_items_fetched_total",
            "Raw items returned by fetch adapters."
        );
        describe_counter!(
            "pipeline_source_errors_total",
            "Fetch adapter failures and timeouts."
        );
        describe_histogram!("pipeline_fetch_ms", "Per-adapter fetch time in milliseconds.");
    });
}

/// Run one adapter under `timeout`. Errors and timeouts become
/// `SourceUnavailable`.
pub async fn fetch_one(
    provider: &dyn SourceProvider,
    tickers: &[String],
    timeout: Duration,
) -> SentinelResult<Vec<RawItem>> {
    let t0 = Instant::now();
    let res = tokio::time::timeout(timeout, provider.fetch_raw(tickers)).await;
    histogram!("pipeline_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    match res {
        Ok(Ok(items)) => Ok(items),
        Ok(Err(e)) => Err(SentinelError::source_unavailable(
            provider.name(),
            format!("{e:#}"),
        )),
        Err(_) => Err(SentinelError::source_unavailable(
            provider.name(),
            format!("timeout after {}ms", timeout.as_millis()),
        )),
    }
}

/// Fetch from every adapter concurrently. A failing or slow adapter
/// contributes zero items; the call itself never fails.
pub async fn fetch_all(
    providers: &[Box<dyn SourceProvider>],
    tickers: &[String],
    timeout: Duration,
) -> Vec<RawItem> {
    ensure_metrics_described();

    let results = join_all(
        providers
            .iter()
            .map(|p| fetch_one(p.as_ref(), tickers, timeout)),
    )
    .await;

    let mut raw = Vec::new();
    for res in results {
        match res {
            Ok(mut items) => raw.append(&mut items),
            Err(e) => {
                tracing::warn!(error = %e, "source degraded to empty");
                counter!("pipeline_source_errors_total").increment(1);
            }
        }
    }
    counter!("pipeline_items_fetched_total").increment(raw.len() as u64);
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::SourceKind;
    use anyhow::anyhow;

    struct Fixed(&'static str);
    struct Broken;
    struct Slow;

    #[async_trait::async_trait]
    impl SourceProvider for Fixed {
        async fn fetch_raw(&self, _t: &[String]) -> anyhow::Result<Vec<RawItem>> {
            Ok(vec![RawItem::new(SourceKind::News, "fixed", self.0)])
        }
        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[async_trait::async_trait]
    impl SourceProvider for Broken {
        async fn fetch_raw(&self, _t: &[String]) -> anyhow::Result<Vec<RawItem>> {
            Err(anyhow!("403 forbidden"))
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[async_trait::async_trait]
    impl SourceProvider for Slow {
        async fn fetch_raw(&self, _t: &[String]) -> anyhow::Result<Vec<RawItem>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![RawItem::new(SourceKind::Chat, "slow", "late")])
        }
        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failing_and_slow_sources_degrade_to_empty() {
        let providers: Vec<Box<dyn SourceProvider>> =
            vec![Box::new(Broken), Box::new(Fixed("AAPL up")), Box::new(Slow)];
        let out = fetch_all(&providers, &["AAPL".to_string()], Duration::from_millis(50)).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "AAPL up");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_maps_to_source_unavailable() {
        let err = fetch_one(&Slow, &[], Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, SentinelError::SourceUnavailable { ref name, .. } if name == "slow"));
    }
}

// src/pipeline.rs
//! fetch → clean → dedupe → score → aggregate.
//!
//! Every stage is fail-soft, so a cycle always yields one signal per ticker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;

use crate::ingest::{self, types::SourceProvider, CleanedItem};
use crate::preproc;
use crate::sentiment::{ScoredItem, SentimentEnsemble};
use crate::signals::{self, Signal, Stamper, SystemStamper};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_cycles_total", "Completed pipeline cycles.");
        describe_counter!(
            "pipeline_items_deduped_total",
            "Items dropped as duplicates."
        );
        describe_histogram!("pipeline_cycle_ms", "End-to-end cycle time in milliseconds.");
    });
}

/// Result of one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleOutput {
    pub items: Vec<ScoredItem>,
    pub signals: Vec<Signal>,
}

pub struct Pipeline {
    providers: Vec<Box<dyn SourceProvider>>,
    ensemble: Arc<SentimentEnsemble>,
    source_timeout: Duration,
    stamper: Arc<dyn Stamper>,
}

impl Pipeline {
    pub fn new(
        providers: Vec<Box<dyn SourceProvider>>,
        ensemble: Arc<SentimentEnsemble>,
        source_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            ensemble,
            source_timeout,
            stamper: Arc::new(SystemStamper),
        }
    }

    pub fn with_stamper(mut self, stamper: Arc<dyn Stamper>) -> Self {
        self.stamper = stamper;
        self
    }

    pub fn ensemble(&self) -> &SentimentEnsemble {
        &self.ensemble
    }

    /// Fetch, clean and dedupe. Failed sources contribute nothing.
    pub async fn collect(&self, tickers: &[String]) -> Vec<CleanedItem> {
        ensure_metrics_described();

        let raw = ingest::fetch_all(&self.providers, tickers, self.source_timeout).await;
        let fetched = raw.len();

        let cleaned = preproc::clean(raw);
        let unique = preproc::dedupe(cleaned);
        counter!("pipeline_items_deduped_total").increment((fetched - unique.len()) as u64);

        tracing::debug!(fetched, kept = unique.len(), "items ready for scoring");
        unique
    }

    pub async fn score(&self, items: Vec<CleanedItem>) -> Vec<ScoredItem> {
        self.ensemble.score(items).await
    }

    pub async fn analyze(&self, tickers: &[String]) -> Vec<ScoredItem> {
        let items = self.collect(tickers).await;
        self.score(items).await
    }

    pub fn aggregate(&self, items: &[ScoredItem], tickers: &[String]) -> Vec<Signal> {
        signals::aggregate_with(items, tickers, self.stamper.as_ref())
    }

    /// One full pass for `tickers`. Never fails.
    pub async fn run_cycle(&self, tickers: &[String]) -> CycleOutput {
        let t0 = Instant::now();
        let items = self.analyze(tickers).await;
        let signals = self.aggregate(&items, tickers);
        Self::record_cycle(t0, items.len(), tickers.len());
        CycleOutput { items, signals }
    }

    /// Cycle bookkeeping shared with callers that drive the stages themselves.
    pub fn record_cycle(started: Instant, items: usize, tickers: usize) {
        counter!("pipeline_cycles_total").increment(1);
        histogram!("pipeline_cycle_ms").record(started.elapsed().as_secs_f64() * 1_000.0);
        tracing::info!(items, tickers, "pipeline cycle finished");
    }
}

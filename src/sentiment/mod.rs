// src/sentiment/mod.rs
//! Weighted ensemble over pluggable sub-scorers.
//!
//! Each sub-scorer maps text to `[0, 1]`. A sub-scorer that errors, times
//! out or returns a non-finite value contributes the failure default
//! (`0.0` unless overridden) instead of failing the item.

pub mod finbert;
pub mod lexicon;
pub mod llm;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;

use crate::config::ComponentWeight;
use crate::error::{SentinelError, SentinelResult};
use crate::ingest::types::CleanedItem;

pub use finbert::FinbertScorer;
pub use lexicon::LexiconScorer;
pub use llm::LlmScorer;

/// Allowed deviation of the weight sum from 1.0.
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// Items scored concurrently within one `score` call.
const ITEM_CONCURRENCY: usize = 8;

/// One sentiment backend.
#[async_trait]
pub trait SubScorer: Send + Sync {
    fn name(&self) -> &str;
    async fn score_one(&self, text: &str) -> anyhow::Result<f64>;
}

/// A cleaned item annotated with its ensemble score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredItem {
    #[serde(flatten)]
    pub item: CleanedItem,
    pub sentiment: f64,
    pub sentiment_breakdown: BTreeMap<String, f64>,
}

impl ScoredItem {
    pub fn text(&self) -> &str {
        &self.item.text
    }
}

struct Weighted {
    weight: f64,
    scorer: Arc<dyn SubScorer>,
}

pub struct SentimentEnsemble {
    components: Vec<Weighted>,
    timeout: Duration,
    failure_default: f64,
}

impl std::fmt::Debug for SentimentEnsemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentEnsemble")
            .field("weights", &self.weights())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SentimentEnsemble {
    /// Validates that weights are finite, non-negative, uniquely named and
    /// sum to 1.0 within [`WEIGHT_EPSILON`].
    pub fn new(
        components: Vec<(f64, Arc<dyn SubScorer>)>,
        timeout: Duration,
    ) -> SentinelResult<Self> {
        if components.is_empty() {
            return Err(SentinelError::Configuration(
                "ensemble needs at least one component".into(),
            ));
        }

        let mut names = std::collections::HashSet::new();
        for (w, s) in &components {
            if !w.is_finite() || *w < 0.0 {
                return Err(SentinelError::Configuration(format!(
                    "component '{}' has invalid weight {w}",
                    s.name()
                )));
            }
            if !names.insert(s.name().to_string()) {
                return Err(SentinelError::Configuration(format!(
                    "component '{}' configured twice",
                    s.name()
                )));
            }
        }

        let sum: f64 = components.iter().map(|(w, _)| *w).sum();
        if (sum - 1.0).abs() > WEIGHT_EPSILON {
            return Err(SentinelError::Configuration(format!(
                "ensemble weights sum to {sum}, expected 1.0"
            )));
        }

        Ok(Self {
            components: components
                .into_iter()
                .map(|(weight, scorer)| Weighted { weight, scorer })
                .collect(),
            timeout,
            failure_default: 0.0,
        })
    }

    /// Build from named weights, resolving each name through `resolve`.
    /// Unknown names are a configuration error.
    pub fn from_weights<F>(
        weights: &[ComponentWeight],
        timeout: Duration,
        resolve: F,
    ) -> SentinelResult<Self>
    where
        F: Fn(&str) -> Option<Arc<dyn SubScorer>>,
    {
        let mut components = Vec::with_capacity(weights.len());
        for cw in weights {
            let scorer = resolve(&cw.name).ok_or_else(|| {
                SentinelError::Configuration(format!("unknown sentiment component '{}'", cw.name))
            })?;
            components.push((cw.weight, scorer));
        }
        Self::new(components, timeout)
    }

    /// Value substituted for a failed sub-score.
    pub fn with_failure_default(mut self, value: f64) -> Self {
        self.failure_default = value.clamp(0.0, 1.0);
        self
    }

    pub fn weights(&self) -> BTreeMap<String, f64> {
        self.components
            .iter()
            .map(|c| (c.scorer.name().to_string(), c.weight))
            .collect()
    }

    async fn sub_score(&self, c: &Weighted, text: &str) -> f64 {
        match tokio::time::timeout(self.timeout, c.scorer.score_one(text)).await {
            Ok(Ok(v)) if v.is_finite() => v.clamp(0.0, 1.0),
            Ok(Ok(v)) => {
                tracing::debug!(scorer = c.scorer.name(), value = v, "non-finite sub-score");
                self.failure_default
            }
            Ok(Err(e)) => {
                tracing::debug!(scorer = c.scorer.name(), error = ?e, "sub-scorer failed");
                self.failure_default
            }
            Err(_) => {
                tracing::debug!(scorer = c.scorer.name(), "sub-scorer timed out");
                self.failure_default
            }
        }
    }

    /// Score one text: `(weighted sum, per-component breakdown)`.
    pub async fn score_text(&self, text: &str) -> (f64, BTreeMap<String, f64>) {
        let subs = join_all(self.components.iter().map(|c| self.sub_score(c, text))).await;

        let mut total = 0.0;
        let mut breakdown = BTreeMap::new();
        for (c, s) in self.components.iter().zip(subs) {
            total += c.weight * s;
            breakdown.insert(c.scorer.name().to_string(), s);
        }
        (total.clamp(0.0, 1.0), breakdown)
    }

    /// Annotate every item; output order matches input order.
    pub async fn score(&self, items: Vec<CleanedItem>) -> Vec<ScoredItem> {
        stream::iter(items)
            .map(|item| async move {
                let (sentiment, sentiment_breakdown) = self.score_text(&item.text).await;
                ScoredItem {
                    item,
                    sentiment,
                    sentiment_breakdown,
                }
            })
            .buffered(ITEM_CONCURRENCY)
            .collect()
            .await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Constant-valued sub-scorer.
    pub struct Fixed(pub &'static str, pub f64);

    #[async_trait]
    impl SubScorer for Fixed {
        fn name(&self) -> &str {
            self.0
        }
        async fn score_one(&self, _text: &str) -> anyhow::Result<f64> {
            Ok(self.1)
        }
    }

    /// Scores text by looking for a `score=<f>` marker; 0.5 otherwise.
    pub struct Marker;

    #[async_trait]
    impl SubScorer for Marker {
        fn name(&self) -> &str {
            "marker"
        }
        async fn score_one(&self, text: &str) -> anyhow::Result<f64> {
            Ok(text
                .split_whitespace()
                .find_map(|w| w.strip_prefix("score=").and_then(|v| v.parse().ok()))
                .unwrap_or(0.5))
        }
    }

    pub fn marker_ensemble() -> SentimentEnsemble {
        SentimentEnsemble::new(vec![(1.0, Arc::new(Marker) as Arc<dyn SubScorer>)], Duration::from_secs(1))
            .expect("valid weights")
    }
}

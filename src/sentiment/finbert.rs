// src/sentiment/finbert.rs
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::SubScorer;

pub const DEFAULT_FINBERT_URL: &str =
    "https://api-inference.huggingface.co/models/ProsusAI/finbert";

#[derive(Debug, Deserialize)]
struct Label {
    label: String,
    score: f64,
}

/// Hosted FinBERT classifier (Hugging Face inference API shape).
pub struct FinbertScorer {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl FinbertScorer {
    pub fn new(url: Option<String>, token: Option<String>, timeout: Duration) -> Self {
        Self {
            http: crate::http::client(timeout),
            url: url.unwrap_or_else(|| DEFAULT_FINBERT_URL.to_string()),
            token,
        }
    }
}

/// `0.5 + 0.5 * (p(positive) - p(negative))`.
fn labels_to_score(labels: &[Label]) -> Result<f64> {
    if labels.is_empty() {
        return Err(anyhow!("finbert returned no labels"));
    }
    let prob = |name: &str| {
        labels
            .iter()
            .find(|l| l.label.eq_ignore_ascii_case(name))
            .map(|l| l.score)
            .unwrap_or(0.0)
    };
    Ok(0.5 + 0.5 * (prob("positive") - prob("negative")))
}

#[async_trait]
impl SubScorer for FinbertScorer {
    fn name(&self) -> &str {
        "finbert"
    }

    async fn score_one(&self, text: &str) -> Result<f64> {
        #[derive(Serialize)]
        struct Req<'a> {
            inputs: &'a str,
        }

        let token = self
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("HF_API_TOKEN not set"))?;

        // The API answers either [[labels]] or [labels] depending on the model card.
        let body: serde_json::Value = self
            .http
            .post(&self.url)
            .bearer_auth(token)
            .json(&Req { inputs: text })
            .send()
            .await
            .context("finbert post()")?
            .error_for_status()
            .context("finbert non-2xx")?
            .json()
            .await
            .context("finbert json")?;

        let labels: Vec<Label> = match body {
            serde_json::Value::Array(mut outer)
                if outer.first().is_some_and(serde_json::Value::is_array) =>
            {
                serde_json::from_value(outer.swap_remove(0)).context("finbert labels")?
            }
            other => serde_json::from_value(other).context("finbert labels")?,
        };
        labels_to_score(&labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(json: &str) -> Vec<Label> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn positive_dominant_maps_above_midpoint() {
        let l = labels(
            r#"[{"label":"positive","score":0.9},{"label":"negative","score":0.05},{"label":"neutral","score":0.05}]"#,
        );
        let s = labels_to_score(&l).unwrap();
        assert!((s - 0.925).abs() < 1e-9);
    }

    #[test]
    fn empty_labels_fail() {
        assert!(labels_to_score(&[]).is_err());
    }

    #[tokio::test]
    async fn missing_token_is_an_error() {
        let s = FinbertScorer::new(None, None, Duration::from_secs(1));
        assert!(s.score_one("AAPL").await.is_err());
    }
}

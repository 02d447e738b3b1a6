// src/sentiment/llm.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::SubScorer;
use crate::llm::DynLlm;

const SYSTEM_PROMPT: &str = "You are a financial sentiment classifier. \
Reply with ONE number between 0 and 1: 0 is very bearish, 0.5 neutral, 1 very bullish. \
Output only the number.";

/// Input longer than this is truncated before it is sent.
const MAX_INPUT_CHARS: usize = 1_500;

/// Sentiment via an LLM completion that returns a bare number.
pub struct LlmScorer {
    llm: DynLlm,
}

impl LlmScorer {
    pub fn new(llm: DynLlm) -> Self {
        Self { llm }
    }
}

/// First decimal number in the reply.
fn parse_score(reply: &str) -> Result<f64> {
    static RE_NUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("number regex"));
    RE_NUM
        .find(reply)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or_else(|| anyhow!("no score in llm reply"))
}

#[async_trait]
impl SubScorer for LlmScorer {
    fn name(&self) -> &str {
        "llm"
    }

    async fn score_one(&self, text: &str) -> Result<f64> {
        let input: String = text.chars().take(MAX_INPUT_CHARS).collect();
        let reply = self.llm.complete(SYSTEM_PROMPT, &input, 0.0).await?;
        parse_score(&reply)
    }
}

// src/stream/payload.rs
//! Per-cycle frames pushed to stream subscribers.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::llm::{LlmClient, ANALYST_SYSTEM_PROMPT};
use crate::sentiment::ScoredItem;
use crate::signals::{summarize, Signal};

/// Items quoted to the LLM per insights frame.
const CONTEXT_ITEMS: usize = 20;
const TOP_SENTIMENTS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct Insights {
    pub summary: String,
    pub top_sentiments: Vec<Signal>,
    pub sources: BTreeSet<String>,
}

pub fn signals_frame(signals: &[Signal]) -> Value {
    serde_json::to_value(signals).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "signal frame serialization failed");
        Value::Array(Vec::new())
    })
}

/// LLM summary of the cycle's items, or the aggregate summary when the LLM
/// is unavailable or returns nothing.
pub async fn insights(llm: &dyn LlmClient, items: &[ScoredItem], signals: &[Signal]) -> Insights {
    let summary = match llm_summary(llm, items).await {
        Some(s) => s,
        None => summarize(signals),
    };
    Insights {
        summary,
        top_sentiments: signals.iter().take(TOP_SENTIMENTS).cloned().collect(),
        sources: items.iter().map(|i| i.item.origin.clone()).collect(),
    }
}

async fn llm_summary(llm: &dyn LlmClient, items: &[ScoredItem]) -> Option<String> {
    if !llm.is_configured() || items.is_empty() {
        return None;
    }
    let context: Vec<&str> = items.iter().take(CONTEXT_ITEMS).map(|i| i.text()).collect();
    let prompt = format!(
        "Summarize the current market sentiment and key events based on the following posts:\n{}",
        context.join("\n")
    );
    match llm.complete(ANALYST_SYSTEM_PROMPT, &prompt, 0.2).await {
        Ok(s) if !s.trim().is_empty() => Some(s),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(provider = llm.provider_name(), error = ?e, "insights summary fell back");
            None
        }
    }
}

pub fn insights_frame(insights: &Insights) -> Value {
    serde_json::to_value(insights).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "insights frame serialization failed");
        Value::Null
    })
}

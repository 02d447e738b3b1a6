// src/api/dto.rs
//! Request and response bodies of the `/v1` surface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ingest::providers::SearchHit;
use crate::rag::Document;
use crate::signals::{Action, Signal};

pub const DISCLAIMER: &str = "This is a research prototype, not financial advice.";

fn demo() -> String {
    "demo".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SignalsQuery {
    #[serde(default = "demo")]
    pub watchlist_id: String,
}

#[derive(Debug, Serialize)]
pub struct Explainability {
    pub ensemble_weights: BTreeMap<String, f64>,
    pub top_sentences: Vec<String>,
    pub agreement_score: f64,
}

#[derive(Debug, Serialize)]
pub struct SignalsResponse {
    pub disclaimer: &'static str,
    pub watchlist_id: String,
    pub ranked_tickers: Vec<Signal>,
    pub global_confidence: f64,
    pub explainability: Explainability,
}

#[derive(Debug, Deserialize)]
pub struct WebSearchQuery {
    pub query: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    5
}

#[derive(Debug, Serialize)]
pub struct WebSearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub provider: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Comma separated.
    pub tickers: Option<String>,
    #[serde(default = "default_feed_limit")]
    pub limit: usize,
    #[serde(default = "yes")]
    pub fast: bool,
}

fn default_feed_limit() -> usize {
    30
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSentiment {
    Positive,
    Negative,
    Neutral,
}

impl FeedSentiment {
    pub fn from_score(score: f64) -> Self {
        if score > 0.6 {
            Self::Positive
        } else if score < 0.4 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustScore {
    High,
    Medium,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub id: Uuid,
    pub source: String,
    pub title: String,
    pub summary: String,
    pub sentiment: FeedSentiment,
    pub confidence: f64,
    pub timestamp: String,
    pub url: String,
    pub entities: Vec<String>,
    #[serde(rename = "trustScore")]
    pub trust_score: TrustScore,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    #[serde(default = "demo")]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TickerBody {
    pub ticker: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WatchlistResponse {
    pub watchlist: Vec<String>,
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub query: String,
    pub tickers: Option<Vec<String>>,
    #[serde(default)]
    pub web_search: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl From<SearchHit> for Citation {
    fn from(h: SearchHit) -> Self {
        Self {
            title: h.title,
            url: h.url,
            snippet: h.snippet,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Recommendation {
    pub ticker: String,
    pub action: Action,
    pub score: f64,
    pub confidence: f64,
    pub rationale: String,
    pub drivers: Vec<Citation>,
}

#[derive(Debug, Serialize)]
pub struct ChatExplainability {
    pub ensemble: BTreeMap<String, f64>,
    pub top_contributing_sentences: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatNotes {
    pub politician_claims_policy: &'static str,
    pub data_retention_hint: &'static str,
}

impl Default for ChatNotes {
    fn default() -> Self {
        Self {
            politician_claims_policy: "verify with official filings",
            data_retention_hint: "posts summarized and anonymized",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub chat_id: Uuid,
    pub generated_at: String,
    pub query: String,
    pub summary: String,
    pub disclaimer: &'static str,
    pub recommendations: Vec<Recommendation>,
    pub global_confidence: f64,
    pub explainability: ChatExplainability,
    pub notes: ChatNotes,
    /// Present on `/rag_chat` only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Document>>,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticsResponse {
    pub has_api_key: bool,
    pub base_url: String,
    pub model: String,
}

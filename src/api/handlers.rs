// src/api/handlers.rs
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use super::dto::*;
use super::feed;
use super::identity::ClientIdentity;
use super::{ApiError, AppState};
use crate::error::SentinelError;
use crate::llm::ANALYST_SYSTEM_PROMPT;
use crate::rag::Document;
use crate::sentiment::ScoredItem;
use crate::signals::{global_confidence, summarize, Signal};

const CHAT_CONTEXT_ITEMS: usize = 20;
const CHAT_CITATIONS: usize = 5;
const MAX_RECOMMENDATIONS: usize = 6;
const DRIVERS: usize = 3;

fn admit(state: &AppState, who: &ClientIdentity, endpoint: &str) -> Result<(), ApiError> {
    if state.gate.allow(&who.0, endpoint) {
        Ok(())
    } else {
        tracing::debug!(identity = %who.0, endpoint, "request gated");
        Err(SentinelError::RateLimited {
            endpoint: endpoint.to_string(),
        }
        .into())
    }
}

fn required(value: Option<&str>, field: &str) -> Result<String, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::missing(field))
}

fn request_tickers(requested: Option<Vec<String>>, defaults: &[String]) -> Vec<String> {
    let list: Vec<String> = requested
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if list.is_empty() {
        defaults.to_vec()
    } else {
        list
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn signals(
    State(state): State<AppState>,
    who: ClientIdentity,
    Query(q): Query<SignalsQuery>,
) -> Result<Json<SignalsResponse>, ApiError> {
    admit(&state, &who, "/signals")?;

    let out = state.pipeline.run_cycle(&state.settings.tracked_tickers).await;
    Ok(Json(SignalsResponse {
        disclaimer: DISCLAIMER,
        watchlist_id: q.watchlist_id,
        global_confidence: global_confidence(&out.signals),
        ranked_tickers: out.signals,
        explainability: Explainability {
            ensemble_weights: state.pipeline.ensemble().weights(),
            top_sentences: Vec::new(),
            agreement_score: 0.0,
        },
    }))
}

pub async fn web_search(
    State(state): State<AppState>,
    who: ClientIdentity,
    Query(q): Query<WebSearchQuery>,
) -> Result<Json<WebSearchResponse>, ApiError> {
    let query = required(q.query.as_deref(), "query")?;
    admit(&state, &who, "/web_search")?;

    let mut results = match state.web_search.search(&query, q.max_results).await {
        Ok(hits) => hits,
        Err(e) => {
            tracing::warn!(provider = state.web_search.provider(), error = ?e, "web search degraded");
            Vec::new()
        }
    };
    results.truncate(q.max_results);
    Ok(Json(WebSearchResponse {
        query,
        results,
        provider: state.web_search.provider(),
    }))
}

pub async fn feed(State(state): State<AppState>, Query(q): Query<FeedQuery>) -> Json<Vec<FeedItem>> {
    let tickers = feed::parse_tickers(q.tickers.as_deref(), &state.settings.tracked_tickers);
    Json(feed::build_feed(&state, &tickers, q.limit, q.fast).await)
}

pub async fn get_watchlist(State(state): State<AppState>, Query(u): Query<UserQuery>) -> Json<WatchlistResponse> {
    Json(WatchlistResponse {
        watchlist: state.store.load_watchlist(&u.user_id).await,
        success: true,
    })
}

pub async fn add_to_watchlist(
    State(state): State<AppState>,
    Query(u): Query<UserQuery>,
    Json(body): Json<TickerBody>,
) -> Result<Json<WatchlistResponse>, ApiError> {
    let ticker = required(body.ticker.as_deref(), "ticker")?.to_uppercase();
    Ok(Json(WatchlistResponse {
        watchlist: state.store.add_ticker(&u.user_id, &ticker).await,
        success: true,
    }))
}

pub async fn remove_from_watchlist(
    State(state): State<AppState>,
    Query(u): Query<UserQuery>,
    Json(body): Json<TickerBody>,
) -> Result<Json<WatchlistResponse>, ApiError> {
    let ticker = required(body.ticker.as_deref(), "ticker")?.to_uppercase();
    Ok(Json(WatchlistResponse {
        watchlist: state.store.remove_ticker(&u.user_id, &ticker).await,
        success: true,
    }))
}

async fn citations(state: &AppState, query: &str) -> Vec<Citation> {
    match state.web_search.search(query, CHAT_CITATIONS).await {
        Ok(hits) => hits.into_iter().map(Citation::from).collect(),
        Err(e) => {
            tracing::warn!(error = ?e, "chat citations unavailable");
            Vec::new()
        }
    }
}

async fn llm_answer(state: &AppState, query: &str, items: &[ScoredItem], cites: &[Citation]) -> Option<String> {
    if !state.llm.is_configured() {
        return None;
    }
    let context: Vec<&str> = items.iter().take(CHAT_CONTEXT_ITEMS).map(|i| i.text()).collect();
    let news: Vec<String> = cites
        .iter()
        .take(DRIVERS)
        .map(|c| format!("- {} ({}): {}", c.title, c.url, c.snippet))
        .collect();
    let prompt = format!(
        "User query: {query}\n\nRecent market chatter/news context:\n{}\n\n\
         Top web results (include citations in your reasoning):\n{}\n\n\
         Return a concise summary and trade ideas.",
        context.join("\n"),
        news.join("\n")
    );
    match state.llm.complete(ANALYST_SYSTEM_PROMPT, &prompt, 0.2).await {
        Ok(s) if !s.trim().is_empty() => Some(s),
        Ok(_) => None,
        Err(e) => {
            let err = SentinelError::downstream(format!("{e:#}"));
            tracing::warn!(error = %err, "chat summary fell back to aggregates");
            None
        }
    }
}

fn chat_response(
    state: &AppState,
    query: String,
    summary: String,
    signals: &[Signal],
    cites: &[Citation],
    sources: Option<Vec<Document>>,
) -> ChatResponse {
    let drivers: Vec<Citation> = cites.iter().take(DRIVERS).cloned().collect();
    ChatResponse {
        chat_id: Uuid::new_v4(),
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        query,
        summary,
        disclaimer: DISCLAIMER,
        recommendations: signals
            .iter()
            .take(MAX_RECOMMENDATIONS)
            .map(|s| Recommendation {
                ticker: s.ticker.clone(),
                action: s.action,
                score: s.score,
                confidence: s.confidence,
                rationale: format!("Aggregated sentiment {} with score {}", s.kind.as_str(), s.score),
                drivers: drivers.clone(),
            })
            .collect(),
        global_confidence: global_confidence(signals),
        explainability: ChatExplainability {
            ensemble: state.pipeline.ensemble().weights(),
            top_contributing_sentences: Vec::new(),
        },
        notes: ChatNotes::default(),
        sources,
    }
}

pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Result<Json<ChatResponse>, ApiError> {
    let query = required(Some(&req.query), "query")?;
    let tickers = request_tickers(req.tickers, &state.settings.tracked_tickers);

    let out = state.pipeline.run_cycle(&tickers).await;
    let cites = citations(&state, &query).await;
    let summary = match llm_answer(&state, &query, &out.items, &cites).await {
        Some(s) => s,
        None => summarize(&out.signals),
    };
    Ok(Json(chat_response(&state, query, summary, &out.signals, &cites, None)))
}

fn documents(items: &[ScoredItem], cites: &[Citation]) -> Vec<Document> {
    let mut docs: Vec<Document> = items
        .iter()
        .map(|i| {
            let mut d = Document::new(i.text()).with_meta("source", i.item.origin.clone());
            if let Some(url) = &i.item.url {
                d = d.with_meta("url", url.clone());
            }
            d
        })
        .collect();
    docs.extend(cites.iter().map(|c| {
        Document::new(format!("{} {}", c.title, c.snippet).trim())
            .with_meta("source", "web")
            .with_meta("title", c.title.clone())
            .with_meta("url", c.url.clone())
    }));
    docs
}

pub async fn rag_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let query = required(Some(&req.query), "query")?;
    let tickers = request_tickers(req.tickers, &state.settings.tracked_tickers);

    let out = state.pipeline.run_cycle(&tickers).await;
    let cites = if req.web_search {
        citations(&state, &query).await
    } else {
        Vec::new()
    };

    let mut session = state.rag.session();
    let answer = if !session.index(documents(&out.items, &cites)) {
        tracing::debug!("rag: nothing to index");
        None
    } else if !session.build_chain(0.0) {
        tracing::debug!("rag: no model for the answer chain");
        None
    } else {
        match session.answer(&query).await {
            Ok(a) if !a.result.trim().is_empty() => Some(a),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "rag answer fell back to aggregates");
                None
            }
        }
    };

    let (summary, sources) = match answer {
        Some(a) => (a.result, a.sources),
        None => (summarize(&out.signals), Vec::new()),
    };
    Ok(Json(chat_response(
        &state,
        query,
        summary,
        &out.signals,
        &cites,
        Some(sources),
    )))
}

pub async fn llm_diagnostics(State(state): State<AppState>) -> Json<DiagnosticsResponse> {
    let llm = &state.settings.llm;
    Json(DiagnosticsResponse {
        has_api_key: llm.api_key.is_some(),
        base_url: llm.base_url.clone(),
        model: llm.model.clone(),
    })
}

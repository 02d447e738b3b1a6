// src/api/mod.rs
//! HTTP + WebSocket surface under `/v1`.

pub mod dto;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod identity;
pub mod ws;

use std::sync::Arc;

use axum::{
    http::{request::Parts, HeaderValue},
    routing::{get, post},
    Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::cache::FeedCache;
use crate::config::Settings;
use crate::gate::RequestGate;
use crate::ingest::providers::{GoogleSearch, NewsProvider, WebSearch};
use crate::ingest::types::SourceProvider;
use crate::llm::DynLlm;
use crate::notify::{AlertSink, NotifierMux};
use crate::pipeline::Pipeline;
use crate::rag::{KeywordRag, RagBackend};
use crate::store::DynStore;
use crate::stream::{AlertConfig, StreamContext};

pub use error::ApiError;

/// Process-scoped services, built once at startup and shared by every
/// handler and stream.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub gate: Arc<RequestGate>,
    pub cache: Arc<FeedCache>,
    pub pipeline: Arc<Pipeline>,
    /// News adapter behind the feed cache.
    pub news: Arc<dyn SourceProvider>,
    pub web_search: Arc<dyn WebSearch>,
    pub store: DynStore,
    pub llm: DynLlm,
    pub rag: Arc<dyn RagBackend>,
    pub alerts: Option<Arc<dyn AlertSink>>,
}

impl AppState {
    /// Production wiring around an already-built pipeline.
    pub fn from_settings(settings: Settings, pipeline: Pipeline, llm: DynLlm, store: DynStore) -> Self {
        let alerts = NotifierMux::from_settings(&settings).map(|m| {
            tracing::info!(sinks = m.len(), "alerting enabled");
            Arc::new(m) as Arc<dyn AlertSink>
        });
        Self {
            gate: Arc::new(RequestGate::new(settings.rate_limit, settings.rate_period)),
            cache: Arc::new(FeedCache::new()),
            pipeline: Arc::new(pipeline),
            news: Arc::new(NewsProvider::new(settings.source_timeout)),
            web_search: Arc::new(GoogleSearch::new(
                settings.google_search_api_key.clone(),
                settings.google_cse_id.clone(),
                settings.source_timeout,
            )),
            store,
            rag: Arc::new(KeywordRag::new(llm.clone())),
            llm,
            alerts,
            settings: Arc::new(settings),
        }
    }

    /// Shared context for streaming connections on the tracked tickers.
    pub fn stream_context(&self) -> StreamContext {
        StreamContext {
            pipeline: Arc::clone(&self.pipeline),
            tickers: self.settings.tracked_tickers.clone(),
            interval: self.settings.stream_interval,
            alerts: self.alerts.clone().map(|sink| AlertConfig {
                sink,
                threshold: self.settings.alert_threshold,
            }),
            store: Arc::clone(&self.store),
            llm: Arc::clone(&self.llm),
        }
    }
}

static RE_LOCAL_ORIGIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^http://(?:localhost|127\.0\.0\.1):\d+$").expect("valid local origin regex"));

/// Configured origins plus any local dev port, with credentials.
fn cors(origins: &[String]) -> CorsLayer {
    let allowed: Vec<String> = origins.iter().map(|o| o.trim().to_string()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _req: &Parts| {
                origin.to_str().is_ok_and(|o| {
                    allowed.iter().any(|a| a == o) || RE_LOCAL_ORIGIN.is_match(o)
                })
            },
        ))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/health", get(handlers::health))
        .route("/signals", get(handlers::signals))
        .route("/web_search", get(handlers::web_search))
        .route("/feed", get(handlers::feed))
        .route("/watchlist", get(handlers::get_watchlist))
        .route("/watchlist/add", post(handlers::add_to_watchlist))
        .route("/watchlist/remove", post(handlers::remove_from_watchlist))
        .route("/chat", post(handlers::chat))
        .route("/rag_chat", post(handlers::rag_chat))
        .route("/llm_diagnostics", get(handlers::llm_diagnostics))
        .route("/ws/signals", get(ws::signals))
        .route("/ws/insights", get(ws::insights));

    Router::new()
        .nest("/v1", v1)
        .layer(cors(&state.settings.frontend_origins))
        .with_state(state)
}

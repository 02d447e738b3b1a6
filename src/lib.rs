// src/lib.rs
// Library surface shared by the binary and the integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod gate;
pub mod http;
pub mod ingest;
pub mod llm;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod preproc;
pub mod rag;
pub mod sentiment;
pub mod signals;
pub mod store;
pub mod stream;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;

pub use crate::api::{router, AppState};
pub use crate::error::{SentinelError, SentinelResult};

use crate::config::Settings;
use crate::ingest::providers::default_providers;
use crate::llm::{build_llm, DynLlm};
use crate::pipeline::Pipeline;
use crate::sentiment::{FinbertScorer, LexiconScorer, LlmScorer, SentimentEnsemble, SubScorer};
use crate::store::build_store;

/// Ensemble from the weights file (or defaults), resolving component names
/// to the built-in scorers.
pub fn build_ensemble(settings: &Settings, llm: &DynLlm) -> Result<SentimentEnsemble> {
    let weights = config::load_components_default().context("loading ensemble weights")?;

    let lexicon: Arc<dyn SubScorer> = Arc::new(LexiconScorer::new());
    let finbert: Arc<dyn SubScorer> = Arc::new(FinbertScorer::new(
        settings.finbert_url.clone(),
        settings.hf_api_token.clone(),
        settings.scorer_timeout,
    ));
    let llm_scorer: Arc<dyn SubScorer> = Arc::new(LlmScorer::new(Arc::clone(llm)));

    let ensemble = SentimentEnsemble::from_weights(&weights, settings.scorer_timeout, |name| {
        match name {
            "lexicon" => Some(Arc::clone(&lexicon)),
            "finbert" => Some(Arc::clone(&finbert)),
            "llm" => Some(Arc::clone(&llm_scorer)),
            _ => None,
        }
    })?;
    tracing::info!(weights = ?ensemble.weights(), "sentiment ensemble ready");
    Ok(ensemble)
}

/// Every process-scoped service, wired from settings.
pub fn build_state(settings: Settings) -> Result<AppState> {
    let llm = build_llm(&settings.llm);
    let ensemble = build_ensemble(&settings, &llm)?;
    let pipeline = Pipeline::new(
        default_providers(&settings),
        Arc::new(ensemble),
        settings.source_timeout,
    );
    let store = build_store(&settings);
    tracing::info!(store = store.backend(), llm = llm.provider_name(), "services wired");
    Ok(AppState::from_settings(settings, pipeline, llm, store))
}

/// The `/v1` application. The metrics route is added by the binary.
pub fn app(settings: Settings) -> Result<Router> {
    Ok(router(build_state(settings)?))
}

// src/metrics.rs
//! Prometheus recorder and the `/metrics` route.

use std::time::Duration;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global recorder. Fails if one is already installed.
    pub fn init(news_cache_ttl: Duration) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("installing prometheus recorder")?;

        describe_counter!("gate_rejections_total", "Requests rejected by the request gate.");
        describe_counter!("feed_cache_hits_total", "Feed cache reads served from cache.");
        describe_counter!("feed_cache_misses_total", "Feed cache reads that refreshed.");
        describe_counter!("stream_alerts_sent_total", "Alerts delivered by streaming loops.");
        describe_gauge!("stream_connections", "Open streaming connections.");

        gauge!("feed_cache_ttl_seconds").set(news_cache_ttl.as_secs_f64());

        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

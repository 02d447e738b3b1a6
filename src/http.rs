//! Shared outbound HTTP client construction.

use std::time::Duration;

const USER_AGENT: &str = "market-sentinel/0.1";

/// Client with connect + total timeouts. Falls back to reqwest defaults when
/// the builder cannot initialize (TLS backend unavailable).
pub fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4).min(timeout))
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "http client builder failed; using defaults");
            reqwest::Client::new()
        })
}

// src/config/mod.rs
//! Process settings, read once at startup from the environment (and `.env`).

pub mod ensemble;

use std::str::FromStr;
use std::time::Duration;

pub use ensemble::{load_components_default, load_components_from, ComponentWeight};

pub const DEFAULT_TICKERS: [&str; 4] = ["AAPL", "TSLA", "MSFT", "RELIANCE.NS"];
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-oss-20b:free";

/// LLM endpoint settings (OpenRouter, OpenAI-compatible).
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            model: DEFAULT_OPENROUTER_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Request gate: max admitted calls per key and period.
    pub rate_limit: usize,
    pub rate_period: Duration,
    /// Reverse proxies in front of the service that append to
    /// `X-Forwarded-For`. Zero means forwarding headers are ignored and the
    /// peer address is the client identity.
    pub trusted_proxy_hops: usize,
    pub news_cache_ttl: Duration,
    pub tracked_tickers: Vec<String>,
    pub stream_interval: Duration,
    pub alert_webhook_url: Option<String>,
    pub alert_threshold: f64,
    /// Upper bound for a single fetch adapter call.
    pub source_timeout: Duration,
    /// Upper bound for a single sub-scorer call.
    pub scorer_timeout: Duration,
    pub frontend_origins: Vec<String>,
    pub llm: LlmSettings,
    pub finbert_url: Option<String>,
    pub hf_api_token: Option<String>,
    pub google_search_api_key: Option<String>,
    pub google_cse_id: Option<String>,
    pub slack_api_key: Option<String>,
    pub slack_channel: String,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    /// Slack / Discord / Telegram webhooks receiving plain-text alerts.
    pub chat_webhooks: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rate_limit: 100,
            rate_period: Duration::from_secs(60),
            trusted_proxy_hops: 0,
            news_cache_ttl: Duration::from_secs(60),
            tracked_tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            stream_interval: Duration::from_secs(15),
            alert_webhook_url: None,
            alert_threshold: 0.7,
            source_timeout: Duration::from_millis(5_000),
            scorer_timeout: Duration::from_millis(3_000),
            frontend_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            llm: LlmSettings::default(),
            finbert_url: None,
            hf_api_token: None,
            google_search_api_key: None,
            google_cse_id: None,
            slack_api_key: None,
            slack_channel: "general".to_string(),
            supabase_url: None,
            supabase_key: None,
            chat_webhooks: Vec::new(),
        }
    }
}

impl Settings {
    /// Read every setting from the environment, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_env() -> Self {
        let d = Self::default();

        let tracked_tickers = env_list("TRACKED_TICKERS").unwrap_or(d.tracked_tickers);
        let frontend_origins = env_list("FRONTEND_ORIGINS").unwrap_or(d.frontend_origins);

        let chat_webhooks = ["SLACK_WEBHOOK_URL", "DISCORD_WEBHOOK_URL", "TELEGRAM_WEBHOOK_URL"]
            .iter()
            .filter_map(|k| env_opt(k))
            .collect();

        Self {
            rate_limit: env_parse("RATE_LIMIT", d.rate_limit),
            rate_period: Duration::from_secs(env_parse("RATE_PERIOD", 60u64)),
            trusted_proxy_hops: env_parse("TRUSTED_PROXY_HOPS", d.trusted_proxy_hops),
            news_cache_ttl: Duration::from_secs(env_parse("NEWS_CACHE_TTL", 60u64)),
            tracked_tickers,
            stream_interval: Duration::from_secs(env_parse("STREAM_INTERVAL_SECS", 15u64)),
            alert_webhook_url: env_opt("ALERT_WEBHOOK_URL"),
            alert_threshold: env_parse("ALERT_CONFIDENCE_THRESHOLD", d.alert_threshold)
                .clamp(0.0, 1.0),
            source_timeout: Duration::from_millis(env_parse("SOURCE_TIMEOUT_MS", 5_000u64)),
            scorer_timeout: Duration::from_millis(env_parse("SCORER_TIMEOUT_MS", 3_000u64)),
            frontend_origins,
            llm: LlmSettings {
                api_key: env_opt("OPENROUTER_API_KEY"),
                base_url: env_opt("OPENROUTER_BASE_URL")
                    .or_else(|| env_opt("OPENROUTER_URL"))
                    .unwrap_or(d.llm.base_url),
                model: env_opt("OPENROUTER_MODEL").unwrap_or(d.llm.model),
            },
            finbert_url: env_opt("FINBERT_URL"),
            hf_api_token: env_opt("HF_API_TOKEN"),
            google_search_api_key: env_opt("GOOGLE_SEARCH_API_KEY"),
            google_cse_id: env_opt("GOOGLE_CSE_ID"),
            slack_api_key: env_opt("SLACK_API_KEY"),
            slack_channel: env_opt("SLACK_CHANNEL").unwrap_or(d.slack_channel),
            supabase_url: env_opt("SUPABASE_URL"),
            supabase_key: env_opt("SUPABASE_KEY"),
            chat_webhooks,
        }
    }
}

/// Non-empty, trimmed env value.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env_opt(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Comma-separated list; `None` when unset or empty after trimming.
fn env_list(key: &str) -> Option<Vec<String>> {
    let raw = env_opt(key)?;
    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[serial_test::serial]
    #[test]
    fn env_overrides_and_fallbacks() {
        env::set_var("RATE_LIMIT", "3");
        env::set_var("RATE_PERIOD", "not-a-number");
        env::set_var("TRACKED_TICKERS", " NVDA , ,AMD ");
        env::set_var("ALERT_CONFIDENCE_THRESHOLD", "4.0");
        env::set_var("OPENROUTER_API_KEY", "   ");
        env::set_var("TRUSTED_PROXY_HOPS", "1");

        let s = Settings::from_env();
        assert_eq!(s.rate_limit, 3);
        assert_eq!(s.rate_period, Duration::from_secs(60));
        assert_eq!(s.tracked_tickers, vec!["NVDA".to_string(), "AMD".to_string()]);
        assert_eq!(s.alert_threshold, 1.0);
        assert!(s.llm.api_key.is_none());
        assert_eq!(s.trusted_proxy_hops, 1);

        for k in [
            "RATE_LIMIT",
            "RATE_PERIOD",
            "TRACKED_TICKERS",
            "ALERT_CONFIDENCE_THRESHOLD",
            "OPENROUTER_API_KEY",
            "TRUSTED_PROXY_HOPS",
        ] {
            env::remove_var(k);
        }
    }

    #[test]
    fn defaults_track_four_tickers() {
        let s = Settings::default();
        assert_eq!(s.tracked_tickers.len(), 4);
        assert_eq!(s.stream_interval, Duration::from_secs(15));
        assert_eq!(s.trusted_proxy_hops, 0);
        assert!((s.alert_threshold - 0.7).abs() < f64::EPSILON);
    }
}

// src/llm.rs
//! LLM client: OpenRouter chat completions (OpenAI-compatible) behind a trait,
//! with a disabled variant when no key is configured.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmSettings;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// One system + user turn; returns the first choice's content.
    async fn complete(&self, system: &str, prompt: &str, temperature: f32) -> Result<String>;
    fn is_configured(&self) -> bool;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynLlm = Arc<dyn LlmClient>;

/// System turn for market summaries and chat answers.
pub const ANALYST_SYSTEM_PROMPT: &str = "You are a market sentiment analyst. \
Summarize retail and news sentiment for the listed tickers in a few sentences. \
Cite sources when given. Never give personalized financial advice.";

/// Real client when an API key is present, otherwise [`DisabledLlm`].
pub fn build_llm(settings: &LlmSettings) -> DynLlm {
    match settings.api_key.as_deref() {
        Some(key) => Arc::new(OpenRouterClient::new(key, &settings.base_url, &settings.model)),
        None => {
            tracing::info!("OPENROUTER_API_KEY not set; LLM features use local fallbacks");
            Arc::new(DisabledLlm)
        }
    }
}

/// Accepts either a base URL or a full `/chat/completions` endpoint.
pub fn chat_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/chat/completions")
    }
}

pub struct OpenRouterClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(api_key: &str, base_url: &str, model: &str) -> Self {
        Self {
            http: crate::http::client(Duration::from_secs(30)),
            api_key: api_key.to_string(),
            endpoint: chat_endpoint(base_url),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(&self, system: &str, prompt: &str, temperature: f32) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature,
        };

        let body: Resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("X-Title", "MarketSentinel")
            .json(&req)
            .send()
            .await
            .context("openrouter post()")?
            .error_for_status()
            .context("openrouter non-2xx")?
            .json()
            .await
            .context("openrouter json")?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(anyhow!("openrouter returned an empty completion"));
        }
        Ok(content)
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &'static str {
        "openrouter"
    }
}

/// Always errors; callers fall back to local summaries.
pub struct DisabledLlm;

#[async_trait]
impl LlmClient for DisabledLlm {
    async fn complete(&self, _system: &str, _prompt: &str, _temperature: f32) -> Result<String> {
        Err(anyhow!("llm not configured"))
    }

    fn is_configured(&self) -> bool {
        false
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Returns a fixed reply for every prompt.
    pub struct CannedLlm(pub &'static str);

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _s: &str, _p: &str, _t: f32) -> Result<String> {
            Ok(self.0.to_string())
        }
        fn is_configured(&self) -> bool {
            true
        }
        fn provider_name(&self) -> &'static str {
            "canned"
        }
    }
}

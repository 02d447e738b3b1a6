// tests/common/mod.rs
//
// Stub adapters and an AppState builder for router-level tests. Nothing
// here opens a socket.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::{self, Body};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt as _;

use market_sentinel::api::AppState;
use market_sentinel::cache::FeedCache;
use market_sentinel::config::Settings;
use market_sentinel::gate::RequestGate;
use market_sentinel::ingest::providers::{SearchHit, WebSearch};
use market_sentinel::ingest::types::{RawItem, SourceKind, SourceProvider};
use market_sentinel::llm::{DisabledLlm, DynLlm};
use market_sentinel::pipeline::Pipeline;
use market_sentinel::rag::KeywordRag;
use market_sentinel::sentiment::{SentimentEnsemble, SubScorer};
use market_sentinel::store::MemoryStore;

const BODY_LIMIT: usize = 1024 * 1024;

/// Fixed items for every call.
pub struct StaticSource {
    pub origin: &'static str,
    pub texts: Vec<&'static str>,
}

#[async_trait]
impl SourceProvider for StaticSource {
    async fn fetch_raw(&self, _tickers: &[String]) -> Result<Vec<RawItem>> {
        Ok(self
            .texts
            .iter()
            .map(|t| RawItem::new(SourceKind::Social, self.origin, *t))
            .collect())
    }
    fn name(&self) -> &'static str {
        self.origin
    }
}

pub struct DownSource;

#[async_trait]
impl SourceProvider for DownSource {
    async fn fetch_raw(&self, _tickers: &[String]) -> Result<Vec<RawItem>> {
        Err(anyhow!("connection refused"))
    }
    fn name(&self) -> &'static str {
        "down"
    }
}

/// News headlines with titles and timestamps.
pub struct StaticNews(pub Vec<(&'static str, &'static str, &'static str)>);

#[async_trait]
impl SourceProvider for StaticNews {
    async fn fetch_raw(&self, _tickers: &[String]) -> Result<Vec<RawItem>> {
        Ok(self
            .0
            .iter()
            .map(|(title, summary, ts)| {
                RawItem::new(SourceKind::News, "news", format!("{title} {summary}"))
                    .with_title(*title)
                    .with_url(format!("https://news.test/{}", title.len()))
                    .with_timestamp(*ts)
            })
            .collect())
    }
    fn name(&self) -> &'static str {
        "news"
    }
}

#[derive(Default)]
pub struct StubSearch {
    pub hits: Vec<SearchHit>,
    pub headlines: Vec<RawItem>,
    pub fail: bool,
}

#[async_trait]
impl WebSearch for StubSearch {
    async fn search(&self, query: &str, _max: usize) -> Result<Vec<SearchHit>> {
        if self.fail {
            return Err(anyhow!("search down"));
        }
        Ok(self
            .hits
            .iter()
            .cloned()
            .map(|mut h| {
                h.snippet = format!("{} [{query}]", h.snippet);
                h
            })
            .collect())
    }
    async fn news_by_query(&self, _query: &str, _max: usize) -> Result<Vec<RawItem>> {
        if self.fail {
            return Err(anyhow!("search down"));
        }
        Ok(self.headlines.clone())
    }
    fn provider(&self) -> &'static str {
        "stub"
    }
}

pub fn hit(title: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        url: format!("https://web.test/{title}"),
        snippet: "snippet".to_string(),
    }
}

/// "bull" → 0.9, "bear" → 0.1, anything else 0.5.
pub struct KeywordScorer;

#[async_trait]
impl SubScorer for KeywordScorer {
    fn name(&self) -> &str {
        "lexicon"
    }
    async fn score_one(&self, text: &str) -> Result<f64> {
        let t = text.to_lowercase();
        Ok(if t.contains("bull") {
            0.9
        } else if t.contains("bear") {
            0.1
        } else {
            0.5
        })
    }
}

pub fn settings() -> Settings {
    Settings {
        tracked_tickers: vec!["AAPL".into(), "TSLA".into()],
        stream_interval: Duration::from_millis(5),
        source_timeout: Duration::from_millis(200),
        scorer_timeout: Duration::from_millis(200),
        ..Settings::default()
    }
}

pub struct Fixture {
    pub settings: Settings,
    pub providers: Vec<Box<dyn SourceProvider>>,
    pub news: Arc<dyn SourceProvider>,
    pub search: StubSearch,
    pub llm: DynLlm,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            settings: settings(),
            providers: vec![Box::new(StaticSource {
                origin: "reddit",
                texts: vec!["AAPL bull run continues", "TSLA bear trap forming"],
            })],
            news: Arc::new(StaticNews(vec![])),
            search: StubSearch::default(),
            llm: Arc::new(DisabledLlm),
        }
    }
}

impl Fixture {
    pub fn state(self) -> AppState {
        let ensemble = SentimentEnsemble::new(
            vec![(1.0, Arc::new(KeywordScorer) as Arc<dyn SubScorer>)],
            self.settings.scorer_timeout,
        )
        .expect("valid weights");
        let pipeline = Pipeline::new(self.providers, Arc::new(ensemble), self.settings.source_timeout);
        AppState {
            gate: Arc::new(RequestGate::new(
                self.settings.rate_limit,
                self.settings.rate_period,
            )),
            cache: Arc::new(FeedCache::new()),
            pipeline: Arc::new(pipeline),
            news: self.news,
            web_search: Arc::new(self.search),
            store: Arc::new(MemoryStore::new()),
            rag: Arc::new(KeywordRag::new(self.llm.clone())),
            llm: self.llm,
            alerts: None,
            settings: Arc::new(self.settings),
        }
    }

    pub fn router(self) -> Router {
        market_sentinel::router(self.state())
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("build GET")
}

/// GET as seen from the peer socket `ip`, the way the served router
/// attaches `ConnectInfo`.
pub fn get_from(uri: &str, ip: &str) -> Request<Body> {
    let mut req = get(uri);
    let peer: SocketAddr = format!("{ip}:40000").parse().expect("peer addr");
    req.extensions_mut().insert(ConnectInfo(peer));
    req
}

/// GET from peer `ip` carrying an `X-Forwarded-For` header.
pub fn get_forwarded(uri: &str, ip: &str, forwarded_for: &str) -> Request<Body> {
    let mut req = get_from(uri, ip);
    req.headers_mut().insert(
        "x-forwarded-for",
        forwarded_for.parse().expect("header value"),
    );
    req
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build POST")
}

// tests/stream_loop.rs
//
// Streaming loops driven from the application state, with an in-memory
// push sink instead of a socket.

mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;

use common::*;
use market_sentinel::error::{SentinelError, SentinelResult};
use market_sentinel::llm::{LlmClient, DynLlm};
use market_sentinel::notify::AlertSink;
use market_sentinel::signals::Signal;
use market_sentinel::stream::{CloseReason, PushSink, StreamKind, StreamLoop};

/// Accepts `accept` frames, then reports the peer as gone.
struct CollectSink {
    frames: Arc<Mutex<Vec<Value>>>,
    accept: usize,
}

#[async_trait]
impl PushSink for CollectSink {
    async fn push(&mut self, frame: &Value) -> SentinelResult<()> {
        let mut frames = self.frames.lock();
        if frames.len() >= self.accept {
            return Err(SentinelError::ConnectionClosed);
        }
        frames.push(frame.clone());
        Ok(())
    }
    async fn close(&mut self) {}
}

#[derive(Default)]
struct Recorder(Mutex<Vec<Vec<Signal>>>);

#[async_trait]
impl AlertSink for Recorder {
    async fn send_signals(&self, signals: &[Signal]) -> Result<()> {
        self.0.lock().push(signals.to_vec());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "recorder"
    }
}

struct Summarizer;

#[async_trait]
impl LlmClient for Summarizer {
    async fn complete(&self, _system: &str, prompt: &str, _t: f32) -> Result<String> {
        Ok(format!("{} posts reviewed", prompt.lines().count().saturating_sub(1)))
    }
    fn is_configured(&self) -> bool {
        true
    }
    fn provider_name(&self) -> &'static str {
        "summarizer"
    }
}

#[tokio::test]
async fn signals_stream_pushes_and_alerts_once_for_steady_state() {
    let recorder = Arc::new(Recorder::default());
    let mut state = Fixture::default().state();
    state.alerts = Some(recorder.clone() as Arc<dyn AlertSink>);
    let ctx = state.stream_context();
    assert_eq!(ctx.interval, Duration::from_millis(5));

    let frames = Arc::new(Mutex::new(Vec::new()));
    let sink = CollectSink {
        frames: frames.clone(),
        accept: 3,
    };
    let (_stop, rx) = watch::channel(false);
    let report = StreamLoop::new(ctx, StreamKind::Signals, sink).run(rx).await;

    assert_eq!(report.reason, CloseReason::PushFailed);
    assert_eq!(report.cycles, 3);
    assert_eq!(report.alerts_sent, 1);

    let frames = frames.lock();
    assert_eq!(frames.len(), 3);
    for f in frames.iter() {
        assert_eq!(f[0]["ticker"], "AAPL");
        assert_eq!(f[1]["ticker"], "TSLA");
    }
    // Both tickers sit at confidence 0.8, above the 0.7 default.
    assert_eq!(recorder.0.lock()[0].len(), 2);
}

#[tokio::test]
async fn insights_stream_carries_summary_and_sources() {
    let llm: DynLlm = Arc::new(Summarizer);
    let state = Fixture {
        llm,
        ..Fixture::default()
    }
    .state();

    let frames = Arc::new(Mutex::new(Vec::new()));
    let sink = CollectSink {
        frames: frames.clone(),
        accept: 1,
    };
    let (_stop, rx) = watch::channel(false);
    let report = StreamLoop::new(state.stream_context(), StreamKind::Insights, sink)
        .run(rx)
        .await;
    assert_eq!(report.cycles, 1);
    assert_eq!(report.alerts_sent, 0);

    let frame = &frames.lock()[0];
    assert_eq!(frame["summary"], "2 posts reviewed");
    assert_eq!(frame["sources"], serde_json::json!(["reddit"]));
    assert_eq!(frame["top_sentiments"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn cancelled_before_first_cycle_closes_immediately() {
    let state = Fixture::default().state();
    let frames = Arc::new(Mutex::new(Vec::new()));
    let sink = CollectSink {
        frames: frames.clone(),
        accept: usize::MAX,
    };
    let (stop, rx) = watch::channel(false);
    stop.send(true).expect("receiver alive");

    let report = StreamLoop::new(state.stream_context(), StreamKind::Signals, sink)
        .run(rx)
        .await;
    assert_eq!(report.reason, CloseReason::Cancelled);
    assert!(frames.lock().is_empty());
}

// src/stream/mod.rs
//! Per-connection streaming loop.
//!
//! `Connected -> (Fetch -> Score -> Aggregate -> Push -> [Alert] -> Sleep)* -> Closed`
//!
//! The loop never ends because of a pipeline problem; only cancellation or a
//! failed push closes it.

pub mod alert;
pub mod payload;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, gauge};
use serde_json::Value;
use tokio::sync::watch;

use crate::error::SentinelResult;
use crate::llm::DynLlm;
use crate::notify::AlertSink;
use crate::pipeline::Pipeline;
use crate::signals::Signal;
use crate::store::DynStore;

pub use alert::AlertGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connected,
    Fetch,
    Score,
    Aggregate,
    Push,
    Alert,
    Sleep,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// JSON array of signals per cycle; persists and alerts.
    Signals,
    /// `{summary, top_sentiments, sources}` per cycle.
    Insights,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signals => "signals",
            Self::Insights => "insights",
        }
    }
}

/// Outbound half of a stream connection.
#[async_trait]
pub trait PushSink: Send {
    /// `Err(ConnectionClosed)` once the peer is gone.
    async fn push(&mut self, frame: &Value) -> SentinelResult<()>;
    /// Idempotent.
    async fn close(&mut self);
}

#[derive(Clone)]
pub struct AlertConfig {
    pub sink: Arc<dyn AlertSink>,
    pub threshold: f64,
}

/// Everything a loop needs, shared by all connections.
#[derive(Clone)]
pub struct StreamContext {
    pub pipeline: Arc<Pipeline>,
    pub tickers: Vec<String>,
    pub interval: Duration,
    pub alerts: Option<AlertConfig>,
    pub store: DynStore,
    pub llm: DynLlm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Cancelled,
    PushFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamReport {
    /// Cycles whose frame reached the peer.
    pub cycles: u64,
    pub alerts_sent: u64,
    pub reason: CloseReason,
}

pub struct StreamLoop<S> {
    ctx: StreamContext,
    kind: StreamKind,
    sink: S,
    state: StreamState,
    alert_gate: AlertGate,
    alerts_sent: u64,
}

/// Resolves once cancellation is requested or the sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

impl<S: PushSink> StreamLoop<S> {
    pub fn new(ctx: StreamContext, kind: StreamKind, sink: S) -> Self {
        Self {
            ctx,
            kind,
            sink,
            state: StreamState::Connected,
            alert_gate: AlertGate::new(),
            alerts_sent: 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    fn enter(&mut self, next: StreamState) {
        tracing::trace!(stream = self.kind.as_str(), from = ?self.state, to = ?next, "stream transition");
        self.state = next;
    }

    /// Drives the loop until `cancel` flips to `true` (or its sender drops)
    /// or a push fails. Closes the sink exactly once.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) -> StreamReport {
        gauge!("stream_connections").increment(1.0);
        tracing::info!(stream = self.kind.as_str(), "stream connected");

        let mut cycles = 0u64;
        let reason = loop {
            let pushed = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => break CloseReason::Cancelled,
                res = self.cycle() => res,
            };
            if let Err(e) = pushed {
                tracing::debug!(stream = self.kind.as_str(), error = %e, "push failed");
                break CloseReason::PushFailed;
            }
            cycles += 1;

            self.enter(StreamState::Sleep);
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => break CloseReason::Cancelled,
                _ = tokio::time::sleep(self.ctx.interval) => {}
            }
        };

        self.enter(StreamState::Closed);
        self.sink.close().await;
        gauge!("stream_connections").decrement(1.0);
        tracing::info!(stream = self.kind.as_str(), cycles, ?reason, "stream closed");

        StreamReport {
            cycles,
            alerts_sent: self.alerts_sent,
            reason,
        }
    }

    async fn cycle(&mut self) -> SentinelResult<()> {
        let started = Instant::now();
        let pipeline = Arc::clone(&self.ctx.pipeline);
        let tickers = self.ctx.tickers.clone();

        self.enter(StreamState::Fetch);
        let items = pipeline.collect(&tickers).await;
        self.enter(StreamState::Score);
        let scored = pipeline.score(items).await;
        self.enter(StreamState::Aggregate);
        let signals = pipeline.aggregate(&scored, &tickers);
        Pipeline::record_cycle(started, scored.len(), tickers.len());

        let frame = match self.kind {
            StreamKind::Signals => {
                self.persist(&signals);
                payload::signals_frame(&signals)
            }
            StreamKind::Insights => {
                let insights = payload::insights(self.ctx.llm.as_ref(), &scored, &signals).await;
                payload::insights_frame(&insights)
            }
        };

        self.enter(StreamState::Push);
        self.sink.push(&frame).await?;

        if self.kind == StreamKind::Signals {
            self.alert(&signals).await;
        }
        Ok(())
    }

    fn persist(&self, signals: &[Signal]) {
        let store = Arc::clone(&self.ctx.store);
        let batch = signals.to_vec();
        tokio::spawn(async move { store.store_signals(&batch).await });
    }

    async fn alert(&mut self, signals: &[Signal]) {
        let Some(cfg) = self.ctx.alerts.clone() else {
            return;
        };
        let Some(batch) = self.alert_gate.check(signals, cfg.threshold) else {
            return;
        };
        self.enter(StreamState::Alert);
        match cfg.sink.send_signals(&batch).await {
            Ok(()) => {
                self.alerts_sent += 1;
                counter!("stream_alerts_sent_total").increment(1);
                tracing::info!(count = batch.len(), sink = cfg.sink.name(), "alert dispatched");
            }
            Err(e) => tracing::warn!(sink = cfg.sink.name(), error = ?e, "alert dropped"),
        }
    }
}

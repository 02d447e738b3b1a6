// src/stream/alert.rs
//! Per-connection alert de-duplication.

use crate::signals::{Action, Signal, SignalType};

/// Value identity of a signal, ignoring its id and timestamp which change
/// every cycle.
#[derive(Debug, Clone, PartialEq)]
struct Fingerprint {
    ticker: String,
    kind: SignalType,
    score: f64,
    confidence: f64,
    action: Action,
    evidence_count: usize,
}

impl From<&Signal> for Fingerprint {
    fn from(s: &Signal) -> Self {
        Self {
            ticker: s.ticker.clone(),
            kind: s.kind,
            score: s.score,
            confidence: s.confidence,
            action: s.action,
            evidence_count: s.evidence_count,
        }
    }
}

/// Remembers the last high-confidence batch handed out on this connection.
#[derive(Debug, Default)]
pub struct AlertGate {
    last_sent: Option<Vec<Fingerprint>>,
}

impl AlertGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals at or above `threshold`, unless none qualify or the batch
    /// equals the last one returned. A returned batch becomes the new
    /// last-sent payload whether or not delivery succeeds.
    pub fn check(&mut self, signals: &[Signal], threshold: f64) -> Option<Vec<Signal>> {
        let high: Vec<Signal> = signals
            .iter()
            .filter(|s| s.confidence >= threshold)
            .cloned()
            .collect();
        if high.is_empty() {
            return None;
        }
        let fp: Vec<Fingerprint> = high.iter().map(Fingerprint::from).collect();
        if self.last_sent.as_ref() == Some(&fp) {
            return None;
        }
        self.last_sent = Some(fp);
        Some(high)
    }
}

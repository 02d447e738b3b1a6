// src/gate.rs
//! # Request Gate
//! Fixed-window admission control keyed by `(client identity, endpoint)`.
//!
//! Each key keeps the timestamps of its admitted calls. Stale entries are
//! pruned lazily on access, so a key holds at most `limit` entries. Keys of
//! clients that stop calling are never swept; state resets on restart.

use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};

use metrics::counter;
use parking_lot::Mutex;

type Key = (String, String);

#[derive(Debug)]
pub struct RequestGate {
    limit: usize,
    period: Duration,
    windows: Mutex<HashMap<Key, VecDeque<Instant>>>,
}

impl RequestGate {
    pub fn new(limit: usize, period: Duration) -> Self {
        Self {
            limit,
            period,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject a call now. Admitted calls are recorded.
    pub fn allow(&self, identity: &str, endpoint: &str) -> bool {
        self.allow_at(identity, endpoint, Instant::now())
    }

    /// Admit iff fewer than `limit` recorded calls fall in `(now - period, now]`.
    pub fn allow_at(&self, identity: &str, endpoint: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock();
        let window = windows
            .entry((identity.to_string(), endpoint.to_string()))
            .or_default();

        // Entries at or before the cutoff are out of the window.
        while let Some(&t) = window.front() {
            if now.saturating_duration_since(t) >= self.period {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= self.limit {
            drop(windows);
            counter!("gate_rejections_total", "endpoint" => endpoint.to_string()).increment(1);
            tracing::debug!(endpoint, "request gate rejected call");
            return false;
        }
        window.push_back(now);
        true
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of keys currently tracked (diagnostics).
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().len()
    }
}

// src/store/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::WatchlistStore;
use crate::signals::Signal;

/// Distinct tickers per in-memory watchlist.
pub const MAX_WATCHLIST: usize = 6;

/// Process-local watchlists. Signals are not kept.
#[derive(Debug, Default)]
pub struct MemoryStore {
    lists: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: &str) -> Vec<String> {
        self.lists.lock().get(user_id).cloned().unwrap_or_default()
    }

    /// Appends unless present or full.
    pub fn add(&self, user_id: &str, ticker: &str) -> Vec<String> {
        let mut lists = self.lists.lock();
        let list = lists.entry(user_id.to_string()).or_default();
        if !list.iter().any(|t| t == ticker) && list.len() < MAX_WATCHLIST {
            list.push(ticker.to_string());
        }
        list.clone()
    }

    pub fn remove(&self, user_id: &str, ticker: &str) -> Vec<String> {
        let mut lists = self.lists.lock();
        let list = lists.entry(user_id.to_string()).or_default();
        list.retain(|t| t != ticker);
        list.clone()
    }
}

#[async_trait]
impl WatchlistStore for MemoryStore {
    async fn load_watchlist(&self, user_id: &str) -> Vec<String> {
        self.get(user_id)
    }

    async fn add_ticker(&self, user_id: &str, ticker: &str) -> Vec<String> {
        self.add(user_id, ticker)
    }

    async fn remove_ticker(&self, user_id: &str, ticker: &str) -> Vec<String> {
        self.remove(user_id, ticker)
    }

    async fn store_signals(&self, _signals: &[Signal]) {}

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// src/store/mod.rs
//! Watchlist and signal persistence. Callers never see a store error:
//! remote failures degrade to the in-memory store.

pub mod memory;
pub mod supabase;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Settings;
use crate::signals::Signal;

pub use memory::{MemoryStore, MAX_WATCHLIST};
pub use supabase::SupabaseStore;

#[async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn load_watchlist(&self, user_id: &str) -> Vec<String>;
    /// Returns the watchlist after the change.
    async fn add_ticker(&self, user_id: &str, ticker: &str) -> Vec<String>;
    /// Returns the watchlist after the change.
    async fn remove_ticker(&self, user_id: &str, ticker: &str) -> Vec<String>;
    /// Fire-and-forget; failures are logged.
    async fn store_signals(&self, signals: &[Signal]);
    fn backend(&self) -> &'static str;
}

pub type DynStore = Arc<dyn WatchlistStore>;

/// Supabase when both URL and key are set, memory otherwise.
pub fn build_store(settings: &Settings) -> DynStore {
    match (&settings.supabase_url, &settings.supabase_key) {
        (Some(url), Some(key)) => Arc::new(SupabaseStore::new(url, key)),
        _ => Arc::new(MemoryStore::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_follows_settings() {
        assert_eq!(build_store(&Settings::default()).backend(), "memory");
        let s = Settings {
            supabase_url: Some("https://x.supabase.co".into()),
            supabase_key: Some("k".into()),
            ..Settings::default()
        };
        assert_eq!(build_store(&s).backend(), "supabase");
    }
}

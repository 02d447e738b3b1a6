// src/cache.rs
//! # Feed Cache
//! Keyed TTL cache for the news path. Entries are replaced wholesale on
//! refresh and never evicted otherwise.
//!
//! There is no stampede protection: concurrent misses each run the refresh.
//! The lock is never held across the refresh future.

use std::{
    collections::HashMap,
    future::Future,
    time::{Duration, Instant},
};

use metrics::counter;
use parking_lot::Mutex;

use crate::ingest::types::RawItem;

/// Key of the single global news slot.
pub const NEWS_KEY: &str = "news";

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    items: T,
    fetched_at: Instant,
}

#[derive(Debug)]
pub struct FeedCache<T = Vec<RawItem>> {
    slots: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T> Default for FeedCache<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> FeedCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value if younger than `ttl`, otherwise the result of `refresh`.
    pub async fn get_or_refresh<F, Fut>(&self, key: &str, ttl: Duration, refresh: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.get_or_refresh_at(key, ttl, Instant::now(), refresh).await
    }

    /// As [`get_or_refresh`](Self::get_or_refresh) with an explicit "now".
    pub async fn get_or_refresh_at<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        now: Instant,
        refresh: F,
    ) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(hit) = self.fresh(key, ttl, now) {
            counter!("feed_cache_hits_total").increment(1);
            return hit;
        }
        counter!("feed_cache_misses_total").increment(1);

        let items = refresh().await;
        self.slots.lock().insert(
            key.to_string(),
            CacheEntry {
                items: items.clone(),
                fetched_at: now,
            },
        );
        items
    }

    fn fresh(&self, key: &str, ttl: Duration, now: Instant) -> Option<T> {
        let slots = self.slots.lock();
        let entry = slots.get(key)?;
        (now.saturating_duration_since(entry.fetched_at) < ttl).then(|| entry.items.clone())
    }

    /// Age of the entry under `key`, if any.
    pub fn age(&self, key: &str) -> Option<Duration> {
        self.slots
            .lock()
            .get(key)
            .map(|e| e.fetched_at.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn serves_cached_value_within_ttl_and_refreshes_after() {
        let cache: FeedCache<Vec<u32>> = FeedCache::new();
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_secs(60);
        let t0 = Instant::now();

        let refresh = |v: u32| {
            let calls = &calls;
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                vec![v]
            }
        };

        assert_eq!(cache.get_or_refresh_at(NEWS_KEY, ttl, t0, refresh(1)).await, vec![1]);
        let t1 = t0 + Duration::from_secs(59);
        assert_eq!(cache.get_or_refresh_at(NEWS_KEY, ttl, t1, refresh(2)).await, vec![1]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let t2 = t0 + Duration::from_secs(60);
        assert_eq!(cache.get_or_refresh_at(NEWS_KEY, ttl, t2, refresh(3)).await, vec![3]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // TTL counts from the latest refresh.
        let t3 = t2 + Duration::from_secs(30);
        assert_eq!(cache.get_or_refresh_at(NEWS_KEY, ttl, t3, refresh(4)).await, vec![3]);
    }

    #[tokio::test]
    async fn keys_do_not_share_slots() {
        let cache: FeedCache<&'static str> = FeedCache::new();
        let ttl = Duration::from_secs(60);
        assert_eq!(cache.get_or_refresh("a", ttl, || async { "A" }).await, "A");
        assert_eq!(cache.get_or_refresh("b", ttl, || async { "B" }).await, "B");
        assert_eq!(cache.get_or_refresh("a", ttl, || async { "X" }).await, "A");
        assert!(cache.age("a").is_some());
        assert!(cache.age("c").is_none());
    }

    #[tokio::test]
    async fn zero_ttl_always_refreshes() {
        let cache: FeedCache<u8> = FeedCache::new();
        assert_eq!(cache.get_or_refresh("k", Duration::ZERO, || async { 1 }).await, 1);
        assert_eq!(cache.get_or_refresh("k", Duration::ZERO, || async { 2 }).await, 2);
    }
}

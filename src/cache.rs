//! In-process response cache backed by `moka`.
//!
//! Values are stored as JSON so one cache can hold any serializable payload
//! (site statistics, review summaries, metric snapshots). Hit/miss counters feed
//! the admin performance dashboard.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use moka::future::Cache;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct CacheService {
    inner: Cache<String, Value>,
    max_entries: u64,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl CacheService {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self {
            inner,
            max_entries,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.inner.get(key).await;
        match value.and_then(|v| serde_json::from_value(v).ok()) {
            Some(hit) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(hit)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: impl Into<String>, value: &T) -> AppResult<()> {
        let json = serde_json::to_value(value)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
        self.inner.insert(key.into(), json).await;
        Ok(())
    }

    /// Returns the cached value for `key`, computing and storing it on a miss.
    pub async fn get_or_insert<T, F, Fut>(&self, key: &str, compute: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            return Ok(hit);
        }
        let value = compute().await?;
        self.set(key, &value).await?;
        Ok(value)
    }

    pub async fn remove(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Removes every key matching a `*` wildcard pattern. Returns how many were removed.
    pub async fn remove_by_pattern(&self, pattern: &str) -> usize {
        let keys: Vec<String> = self
            .inner
            .iter()
            .map(|(key, _)| key.as_ref().clone())
            .filter(|key| wildcard_match(pattern, key))
            .collect();
        for key in &keys {
            self.inner.invalidate(key).await;
        }
        self.inner.run_pending_tasks().await;
        keys.len()
    }

    pub async fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }

    pub async fn keys(&self) -> Vec<String> {
        self.inner.run_pending_tasks().await;
        let mut keys: Vec<String> = self.inner.iter().map(|(key, _)| key.as_ref().clone()).collect();
        keys.sort();
        keys
    }

    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    pub fn max_entries(&self) -> u64 {
        self.max_entries
    }

    /// Percentage of lookups served from the cache since startup.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            return 0.0;
        }
        hits as f64 * 100.0 / total as f64
    }
}

/// Glob-style matching where `*` stands for any run of characters.
pub fn wildcard_match(pattern: &str, candidate: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == candidate;
    }

    let (first, rest) = match parts.split_first() {
        Some(split) => split,
        None => return false,
    };
    let Some(mut remaining) = candidate.strip_prefix(first) else {
        return false;
    };

    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return true,
    };
    for part in middle {
        match remaining.find(part) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    remaining.len() >= last.len() && remaining.ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_patterns() {
        assert!(wildcard_match("review_stats:*", "review_stats:42"));
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("*stats*", "site_stats_v2"));
        assert!(wildcard_match("a*c", "abc"));
        assert!(!wildcard_match("a*c", "abd"));
        assert!(!wildcard_match("exact", "exactly"));
        assert!(wildcard_match("exact", "exact"));
        assert!(!wildcard_match("ab*ba", "aba"));
    }

    #[tokio::test]
    async fn get_or_insert_counts_hits_and_misses() {
        let cache = CacheService::new(100, Duration::from_secs(60));
        let first: i64 = cache
            .get_or_insert("answer", || async { Ok(42) })
            .await
            .expect("computed");
        let second: i64 = cache
            .get_or_insert("answer", || async { Ok(7) })
            .await
            .expect("cached");
        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert!((cache.hit_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn remove_by_pattern_only_drops_matching_keys() {
        let cache = CacheService::new(100, Duration::from_secs(60));
        cache.set("review_stats:1", &1).await.expect("set");
        cache.set("review_stats:2", &2).await.expect("set");
        cache.set("site_statistics", &3).await.expect("set");

        let removed = cache.remove_by_pattern("review_stats:*").await;
        assert_eq!(removed, 2);
        assert_eq!(cache.keys().await, vec!["site_statistics".to_string()]);

        cache.clear().await;
        assert_eq!(cache.entry_count().await, 0);
    }
}

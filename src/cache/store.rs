//! Response cache store.
//!
//! Front for a [`CacheBackend`]: serializes entries, enforces TTL with lazy
//! eviction, and keeps hit/miss counters. Cache problems are deliberately
//! quiet — a read failure or corrupt entry is a logged miss, and a write
//! failure surfaces as an error the orchestrator logs and ignores, because a
//! cache must never fail a request that the provider answered.

use super::backend::{CacheBackend, DiskCache, MemoryCache};
use super::key::Fingerprint;
use crate::error::Result;
use crate::types::TokenUsage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Persisted cache entry. Updates replace the whole record; nothing is ever
/// mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub text: String,
    pub model: String,
    pub usage: TokenUsage,
    /// Unix seconds at creation.
    pub created_at: u64,
    pub ttl_secs: u64,
}

impl CachedResponse {
    pub fn is_expired(&self, now: u64) -> bool {
        now.saturating_sub(self.created_at) >= self.ttl_secs
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub evictions: u64,
    pub errors: u64,
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    evictions: AtomicU64,
    errors: AtomicU64,
}

impl AtomicStats {
    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

pub struct ResponseCache {
    backend: Box<dyn CacheBackend>,
    default_ttl: Duration,
    enabled: bool,
    stats: AtomicStats,
}

impl ResponseCache {
    pub fn new(backend: Box<dyn CacheBackend>, default_ttl: Duration) -> Self {
        Self {
            backend,
            default_ttl,
            enabled: true,
            stats: AtomicStats::default(),
        }
    }

    /// Disk-backed cache rooted at `dir`. Entries persist across restarts
    /// until they expire or are evicted.
    pub fn disk(dir: impl Into<PathBuf>, default_ttl: Duration) -> Self {
        Self::new(Box::new(DiskCache::new(dir)), default_ttl)
    }

    /// Cache that accepts writes but never reports hits. Used when caching
    /// is configured off.
    pub fn disabled() -> Self {
        let mut cache = Self::new(Box::new(MemoryCache::new()), Duration::ZERO);
        cache.enabled = false;
        cache
    }

    /// Look up an unexpired entry. Expired entries are eagerly evicted and
    /// reported as a miss; unreadable or structurally invalid entries are
    /// logged and reported as a miss.
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<CachedResponse> {
        if !self.enabled {
            return None;
        }

        let data = match self.backend.read(fingerprint).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(fingerprint = fingerprint.as_str(), error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CachedResponse = match serde_json::from_slice(&data) {
            Ok(entry) => entry,
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(fingerprint = fingerprint.as_str(), error = %e, "corrupt cache entry, discarding");
                let _ = self.backend.remove(fingerprint).await;
                return None;
            }
        };

        if entry.is_expired(unix_now()) {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            debug!(fingerprint = fingerprint.as_str(), "cache entry expired, evicting");
            let _ = self.backend.remove(fingerprint).await;
            return None;
        }

        self.stats.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry)
    }

    /// Idempotently write or overwrite an entry with the default TTL.
    pub async fn put(
        &self,
        fingerprint: &Fingerprint,
        text: &str,
        model: &str,
        usage: TokenUsage,
    ) -> Result<()> {
        self.put_with_ttl(fingerprint, text, model, usage, self.default_ttl)
            .await
    }

    pub async fn put_with_ttl(
        &self,
        fingerprint: &Fingerprint,
        text: &str,
        model: &str,
        usage: TokenUsage,
        ttl: Duration,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let entry = CachedResponse {
            text: text.to_string(),
            model: model.to_string(),
            usage,
            created_at: unix_now(),
            ttl_secs: ttl.as_secs(),
        };
        let data = serde_json::to_vec(&entry)
            .map_err(|e| crate::error::Error::CacheWrite(e.to_string()))?;
        match self.backend.write(fingerprint, &data).await {
            Ok(()) => {
                self.stats.writes.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InvocationParams, Task};

    fn fp(text: &str) -> Fingerprint {
        Fingerprint::compute(Task::Classify, text, &InvocationParams::default())
    }

    #[tokio::test]
    async fn memory_roundtrip() {
        let cache = ResponseCache::new(
            Box::new(MemoryCache::new()),
            Duration::from_secs(60),
        );
        let key = fp("roundtrip");
        assert!(cache.get(&key).await.is_none());

        cache
            .put(&key, "answer", "gpt-4o", TokenUsage::default())
            .await
            .unwrap();
        let entry = cache.get(&key).await.expect("entry should be present");
        assert_eq!(entry.text, "answer");
        assert_eq!(entry.model, "gpt-4o");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss_and_evicted() {
        let backend = MemoryCache::new();
        let key = fp("expired");
        let stale = CachedResponse {
            text: "old".into(),
            model: "gpt-4o".into(),
            usage: TokenUsage::default(),
            created_at: unix_now() - 120,
            ttl_secs: 60,
        };
        CacheBackend::write(&backend, &key, &serde_json::to_vec(&stale).unwrap())
            .await
            .unwrap();

        let cache = ResponseCache::new(Box::new(backend), Duration::from_secs(60));
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.stats().evictions, 1);
        // Eager eviction: the second read misses without another eviction.
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_miss() {
        let backend = MemoryCache::new();
        let key = fp("corrupt");
        CacheBackend::write(&backend, &key, b"not json at all")
            .await
            .unwrap();

        let cache = ResponseCache::new(Box::new(backend), Duration::from_secs(60));
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.stats().errors, 1);
    }

    #[tokio::test]
    async fn overwrite_replaces_whole_entry() {
        let cache = ResponseCache::new(
            Box::new(MemoryCache::new()),
            Duration::from_secs(60),
        );
        let key = fp("overwrite");
        cache
            .put(&key, "first", "gpt-4o", TokenUsage::default())
            .await
            .unwrap();
        cache
            .put(&key, "second", "gpt-4o-mini", TokenUsage::default())
            .await
            .unwrap();
        let entry = cache.get(&key).await.unwrap();
        assert_eq!(entry.text, "second");
        assert_eq!(entry.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn disabled_cache_never_hits() {
        let cache = ResponseCache::disabled();
        let key = fp("disabled");
        cache
            .put(&key, "answer", "gpt-4o", TokenUsage::default())
            .await
            .unwrap();
        assert!(cache.get(&key).await.is_none());
    }
}

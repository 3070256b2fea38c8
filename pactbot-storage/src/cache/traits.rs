//! Cache backend trait, record keys and usage statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pactbot_core::{CacheError, ContractId};

/// Key of a cached contract record: `record:{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    const RECORD_PREFIX: &'static str = "record";

    /// Key under which the record with `id` is cached.
    pub fn record(id: &ContractId) -> Self {
        Self(format!("{}:{}", Self::RECORD_PREFIX, id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key-value cache with per-entry expiry.
///
/// Values are opaque bytes; the record store decides what they mean.
/// Implementations report every failure as a [`CacheError`] and never
/// panic; callers treat any error as "no cache".
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Whether this backend is configured at all.
    ///
    /// `false` means every other call would fail with
    /// [`CacheError::Disabled`], so callers can skip the round trip.
    fn is_available(&self) -> bool;

    /// Get the bytes stored under `key`, or `None` on a miss.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Remove `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Round-trip check used by readiness probes.
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Counters kept by the record store for its cache traffic.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub bypassed: AtomicU64,
    pub fallbacks: AtomicU64,
    pub corrupt_entries: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            corrupt_entries: self.corrupt_entries.load(Ordering::Relaxed),
        }
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from the cache.
    pub hits: u64,
    /// Reads the cache answered with "not present".
    pub misses: u64,
    /// Operations skipped because no cache is configured.
    pub bypassed: u64,
    /// Operations that failed or timed out and were absorbed.
    pub fallbacks: u64,
    /// Entries that could not be decoded.
    pub corrupt_entries: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0) over reads that reached the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

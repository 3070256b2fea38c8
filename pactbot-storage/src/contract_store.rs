//! Cache-aside contract record store.
//!
//! [`ContractStore`] fronts a durable [`RecordStore`] with an optional
//! [`CacheBackend`]. The durable store is the source of truth. The cache is
//! an accelerator only: every cache call is bounded by a timeout and every
//! cache failure is absorbed in [`ContractStore::absorb`], so the read path
//! never depends on cache health.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pactbot_core::{
    CacheError, ContractId, ContractRecord, NewContract, OwnerId, RecordError, RecordResult,
    StorageError,
};

use crate::cache::{CacheBackend, CacheCounters, CacheKey, CacheStats};
use crate::store::RecordStore;

/// Default expiry for cached records, on both populate paths.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default bound on a single cache round trip.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(250);

/// Configuration for the cache-aside store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// TTL for cached records.
    pub cache_ttl: Duration,
    /// Upper bound on each cache call before it counts as a failure.
    pub cache_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the per-call cache timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }
}

/// Health of the cache as seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheHealth {
    /// No cache configured; reads go straight to the durable store.
    Disabled,
    Healthy,
    /// Configured but failing. Reads still succeed from the durable store.
    Degraded { reason: String },
}

/// Owner-scoped contract records with a best-effort cache in front.
pub struct ContractStore {
    records: Arc<dyn RecordStore>,
    cache: Arc<dyn CacheBackend>,
    config: StoreConfig,
    counters: CacheCounters,
}

impl std::fmt::Debug for ContractStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractStore")
            .field("cache_available", &self.cache.is_available())
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl ContractStore {
    pub fn new(
        records: Arc<dyn RecordStore>,
        cache: Arc<dyn CacheBackend>,
        config: StoreConfig,
    ) -> Self {
        Self {
            records,
            cache,
            config,
            counters: CacheCounters::default(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Snapshot of cache hit/miss/fallback counters.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Get the record `id` owned by `owner`.
    ///
    /// Tries the cache first. A cache that is missing, failing, slow, or
    /// holding an unreadable entry behaves exactly like a miss. After a
    /// durable read the record is written back to the cache.
    ///
    /// # Errors
    ///
    /// [`RecordError::NotFound`] when no record matches `(id, owner)`,
    /// including when it exists under another owner.
    /// [`RecordError::StoreUnavailable`] when the durable store fails on a
    /// cache miss.
    pub async fn fetch(&self, id: &ContractId, owner: &OwnerId) -> RecordResult<ContractRecord> {
        if id.is_empty() {
            return Err(RecordError::NotFound);
        }
        let key = CacheKey::record(id);

        if let Some(record) = self.cached(&key, owner).await {
            tracing::debug!(%key, "contract served from cache");
            return Ok(record);
        }

        let record = self
            .records
            .find_owned(id, owner)
            .await?
            .ok_or(RecordError::NotFound)?;

        self.populate(&key, &record).await;
        Ok(record)
    }

    /// Delete the record `id` owned by `owner`, then drop its cache entry.
    ///
    /// The durable delete is authoritative. If the row disappears between
    /// the ownership check and the delete, the call still succeeds.
    pub async fn delete(&self, id: &ContractId, owner: &OwnerId) -> RecordResult<()> {
        if id.is_empty() {
            return Err(RecordError::NotFound);
        }
        if self.records.find_owned(id, owner).await?.is_none() {
            return Err(RecordError::NotFound);
        }

        if !self.records.delete_owned(id, owner).await? {
            tracing::debug!(%id, "contract already deleted by a concurrent request");
        }

        let key = CacheKey::record(id);
        self.absorb(&key, self.call("delete", self.cache.delete(key.as_str())).await);

        tracing::info!(%id, %owner, "contract deleted");
        Ok(())
    }

    /// Validate and store a new analysis for `owner`, then cache it.
    pub async fn create(&self, owner: &OwnerId, new: NewContract) -> RecordResult<ContractRecord> {
        let record = ContractRecord::create(owner.clone(), new)?;
        self.records.insert(&record).await?;
        self.populate(&CacheKey::record(&record.id), &record).await;

        tracing::info!(id = %record.id, %owner, "contract created");
        Ok(record)
    }

    /// Every record owned by `owner`, newest first. Always read from the
    /// durable store.
    pub async fn list(&self, owner: &OwnerId) -> RecordResult<Vec<ContractRecord>> {
        Ok(self.records.list_by_owner(owner).await?)
    }

    /// Check the durable store is reachable.
    pub async fn check_store(&self) -> Result<(), StorageError> {
        self.records.ping().await
    }

    /// Check the cache, bounded by the cache timeout.
    pub async fn check_cache(&self) -> CacheHealth {
        match self.call("ping", self.cache.ping()).await {
            Ok(()) => CacheHealth::Healthy,
            Err(CacheError::Disabled) => CacheHealth::Disabled,
            Err(e) => CacheHealth::Degraded {
                reason: e.to_string(),
            },
        }
    }

    // ------------------------------------------------------------------------
    // Cache plumbing
    // ------------------------------------------------------------------------

    /// Read and decode the cached record, if usable for `owner`.
    async fn cached(&self, key: &CacheKey, owner: &OwnerId) -> Option<ContractRecord> {
        let fetched = self.call("get", self.cache.get(key.as_str())).await;
        let Some(bytes) = self.absorb(key, fetched)? else {
            CacheCounters::bump(&self.counters.misses);
            return None;
        };

        let decoded = serde_json::from_slice::<ContractRecord>(&bytes).map_err(|e| {
            CacheError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            }
        });
        let record = self.absorb(key, decoded)?;

        if !record.is_owned_by(owner) {
            // Let the durable store give the owner-scoped answer.
            CacheCounters::bump(&self.counters.misses);
            return None;
        }

        CacheCounters::bump(&self.counters.hits);
        Some(record)
    }

    /// Best-effort write of `record` under `key`.
    async fn populate(&self, key: &CacheKey, record: &ContractRecord) {
        let encoded = serde_json::to_vec(record).map_err(|e| CacheError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        });
        let Some(bytes) = self.absorb(key, encoded) else {
            return;
        };
        let written = self
            .call("set", self.cache.set(key.as_str(), &bytes, self.config.cache_ttl))
            .await;
        self.absorb(key, written);
    }

    /// Run one cache operation, bounded by the configured timeout.
    ///
    /// Skips the round trip entirely when no cache is configured.
    async fn call<T, F>(&self, operation: &'static str, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        if !self.cache.is_available() {
            return Err(CacheError::Disabled);
        }
        let after = self.config.cache_timeout;
        match tokio::time::timeout(after, op).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout { operation, after }),
        }
    }

    /// Map a cache result to "value or nothing".
    ///
    /// This is the only place cache errors are handled. Every error becomes
    /// `None`, which callers treat as a miss (reads) or a no-op (writes).
    fn absorb<T>(&self, key: &CacheKey, result: Result<T, CacheError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(CacheError::Disabled) => {
                CacheCounters::bump(&self.counters.bypassed);
                None
            }
            Err(error @ CacheError::Corrupt { .. }) => {
                CacheCounters::bump(&self.counters.corrupt_entries);
                tracing::warn!(%key, %error, "ignoring unreadable cache entry");
                None
            }
            Err(error) => {
                CacheCounters::bump(&self.counters.fallbacks);
                tracing::warn!(%key, %error, "cache degraded, continuing without it");
                None
            }
        }
    }
}

//! PactBot Storage - Cache-Aside Contract Records
//!
//! - [`ContractStore`]: owner-scoped fetch, delete, create and list with a
//!   best-effort cache in front of the durable store
//! - [`cache`]: the [`CacheBackend`] trait with Redis, in-memory and disabled
//!   backends
//! - [`store`]: the [`RecordStore`] trait with PostgreSQL and in-memory
//!   backends

pub mod cache;
mod contract_store;
pub mod store;

pub use cache::{CacheBackend, CacheKey, CacheStats, DisabledCache, InMemoryCache, RedisCache};
pub use contract_store::{
    CacheHealth, ContractStore, StoreConfig, DEFAULT_CACHE_TIMEOUT, DEFAULT_CACHE_TTL,
};
pub use store::{DbConfig, InMemoryRecordStore, PgRecordStore, RecordStore};

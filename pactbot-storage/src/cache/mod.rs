//! Cache backends for contract records.
//!
//! The cache is an optimization only. Every backend reports failures as
//! [`CacheError`](pactbot_core::CacheError) and the record store absorbs them.

mod memory;
mod redis_cache;
mod traits;

pub use memory::{DisabledCache, InMemoryCache};
pub use redis_cache::RedisCache;
pub use traits::{CacheBackend, CacheKey, CacheStats};

pub(crate) use traits::CacheCounters;

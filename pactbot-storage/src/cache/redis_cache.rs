//! Redis cache backend.

use std::time::Duration;

use async_trait::async_trait;
use pactbot_core::CacheError;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::traits::CacheBackend;

/// Cache backed by a Redis server.
///
/// Every key is namespaced with `prefix`, so `record:abc` is stored as
/// `{prefix}:record:abc`. An empty prefix stores keys unchanged.
#[derive(Clone)]
pub struct RedisCache {
    client: redis::Client,
    prefix: String,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The connection info may carry a password.
        f.debug_struct("RedisCache")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Parse `url` and build a backend. Does not connect.
    pub fn open(url: &str, prefix: impl Into<String>) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(backend_error)?;
        Ok(Self {
            client,
            prefix: prefix.into(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{key}", self.prefix)
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend_error)
    }
}

fn backend_error(e: redis::RedisError) -> CacheError {
    CacheError::Backend {
        reason: e.to_string(),
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn is_available(&self) -> bool {
        true
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection().await?;
        conn.get(self.namespaced(key)).await.map_err(backend_error)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        // Redis rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.connection().await?;
        let _: () = conn
            .set_ex(self.namespaced(key), value, seconds)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: i64 = conn
            .del(self.namespaced(key))
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(backend_error)?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Backend {
                reason: format!("unexpected PING reply: {pong}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = RedisCache::open("not a url", "pactbot").unwrap_err();
        assert!(matches!(err, CacheError::Backend { .. }));
    }

    #[test]
    fn test_keys_are_namespaced() {
        let cache = RedisCache::open("redis://127.0.0.1:6379", "pactbot").unwrap();
        assert_eq!(cache.namespaced("record:abc"), "pactbot:record:abc");

        let bare = RedisCache::open("redis://127.0.0.1:6379", "").unwrap();
        assert_eq!(bare.namespaced("record:abc"), "record:abc");
    }

    #[test]
    fn test_debug_hides_connection_info() {
        let cache = RedisCache::open("redis://:hunter2@127.0.0.1:6379", "pactbot").unwrap();
        assert!(!format!("{cache:?}").contains("hunter2"));
    }

    #[tokio::test]
    #[ignore = "requires a Redis server at PACTBOT_TEST_REDIS_URL"]
    async fn test_live_round_trip() {
        let url = std::env::var("PACTBOT_TEST_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let cache = RedisCache::open(&url, "pactbot-test").unwrap();
        cache.ping().await.unwrap();

        cache
            .set("record:live", b"{}", Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(cache.get("record:live").await.unwrap(), Some(b"{}".to_vec()));
        cache.delete("record:live").await.unwrap();
        assert_eq!(cache.get("record:live").await.unwrap(), None);
    }
}

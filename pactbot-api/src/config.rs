//! API Configuration Module
//!
//! Configuration for CORS, the listen address, and the record store's cache
//! and durable backends. Everything is loaded from environment variables with
//! defaults suited to local development.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pactbot_core::CacheError;
use pactbot_storage::{
    CacheBackend, DisabledCache, InMemoryCache, RedisCache, StoreConfig, DEFAULT_CACHE_TIMEOUT,
    DEFAULT_CACHE_TTL,
};

use crate::error::{ApiError, ApiResult};

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins. Empty means allow all origins (dev mode).
    /// Example: "https://pactbot.app,https://app.pactbot.app"
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials (the session cookie) in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Host to bind.
    pub bind_host: String,

    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// - `PACTBOT_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `PACTBOT_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `PACTBOT_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `PACTBOT_API_BIND`: Host to bind (default: 0.0.0.0)
    /// - `PORT` or `PACTBOT_API_PORT`: Port (default: 8080)
    pub fn from_env() -> ApiResult<Self> {
        let defaults = Self::default();

        let cors_origins = std::env::var("PACTBOT_CORS_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("PACTBOT_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(defaults.cors_allow_credentials);

        let cors_max_age_secs = std::env::var("PACTBOT_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let bind_host = std::env::var("PACTBOT_API_BIND").unwrap_or(defaults.bind_host);

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("PACTBOT_API_PORT").ok())
        {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", value)))?,
            None => defaults.port,
        };

        Ok(Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            bind_host,
            port,
        })
    }

    /// Socket address to listen on.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

// ============================================================================
// RECORD STORE BACKENDS
// ============================================================================

/// Which cache sits in front of the durable store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKind {
    Disabled,
    /// Process-local cache.
    Memory,
    Redis { url: String, prefix: String },
}

/// Cache configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub kind: CacheKind,
    pub ttl: Duration,
    pub timeout: Duration,
}

impl std::fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Redis URLs may carry a password.
        let kind = match &self.kind {
            CacheKind::Disabled => "disabled".to_string(),
            CacheKind::Memory => "memory".to_string(),
            CacheKind::Redis { prefix, .. } => format!("redis (prefix {prefix:?})"),
        };
        f.debug_struct("CacheConfig")
            .field("kind", &kind)
            .field("ttl", &self.ttl)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            kind: CacheKind::Disabled,
            ttl: DEFAULT_CACHE_TTL,
            timeout: DEFAULT_CACHE_TIMEOUT,
        }
    }
}

impl CacheConfig {
    /// Create CacheConfig from environment variables.
    ///
    /// - `PACTBOT_CACHE`: "memory" for a process-local cache
    /// - `PACTBOT_REDIS_URL`: Redis URL; when unset and `PACTBOT_CACHE` is not
    ///   "memory", the cache is disabled
    /// - `PACTBOT_REDIS_PREFIX`: Key namespace (default: "pactbot")
    /// - `PACTBOT_CACHE_TTL_SECS`: Entry TTL (default: 3600)
    /// - `PACTBOT_CACHE_TIMEOUT_MS`: Per-call timeout (default: 250)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let memory = std::env::var("PACTBOT_CACHE")
            .map(|s| s.eq_ignore_ascii_case("memory"))
            .unwrap_or(false);
        let redis_url = std::env::var("PACTBOT_REDIS_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let kind = match (memory, redis_url) {
            (true, _) => CacheKind::Memory,
            (false, Some(url)) => CacheKind::Redis {
                url,
                prefix: std::env::var("PACTBOT_REDIS_PREFIX")
                    .unwrap_or_else(|_| "pactbot".to_string()),
            },
            (false, None) => CacheKind::Disabled,
        };

        Self {
            kind,
            ttl: std::env::var("PACTBOT_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.ttl),
            timeout: std::env::var("PACTBOT_CACHE_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Construct the configured backend. Does not connect.
    pub fn build_backend(&self) -> Result<Arc<dyn CacheBackend>, CacheError> {
        Ok(match &self.kind {
            CacheKind::Disabled => Arc::new(DisabledCache),
            CacheKind::Memory => Arc::new(InMemoryCache::new()),
            CacheKind::Redis { url, prefix } => Arc::new(RedisCache::open(url, prefix.clone())?),
        })
    }

    /// Construct the configured backend, falling back to [`DisabledCache`]
    /// when it cannot be built. A broken cache never stops the server.
    pub fn backend_or_disabled(&self) -> Arc<dyn CacheBackend> {
        match self.build_backend() {
            Ok(backend) => backend,
            Err(e) => {
                tracing::warn!(error = %e, cache = ?self, "Cache setup failed; caching disabled");
                Arc::new(DisabledCache)
            }
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new()
            .with_ttl(self.ttl)
            .with_timeout(self.timeout)
    }
}

/// Which durable store backs the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Postgres,
    Memory,
}

impl StoreKind {
    /// `PACTBOT_STORE=memory` selects the in-memory store.
    pub fn from_env() -> Self {
        match std::env::var("PACTBOT_STORE") {
            Ok(s) if s.eq_ignore_ascii_case("memory") => StoreKind::Memory,
            _ => StoreKind::Postgres,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.cors_origins.is_empty());
        assert!(!config.cors_allow_credentials);
        assert_eq!(config.cors_max_age_secs, 86400);
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_parse_origins_skips_blanks() {
        let origins = parse_origins("https://pactbot.app, ,https://app.pactbot.app");
        assert_eq!(origins, vec!["https://pactbot.app", "https://app.pactbot.app"]);
    }

    #[test]
    fn test_invalid_bind_host_is_rejected() {
        let config = ApiConfig {
            bind_host: "not a host".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn test_cache_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.kind, CacheKind::Disabled);
        assert_eq!(config.ttl, Duration::from_secs(3600));
        assert_eq!(config.timeout, Duration::from_millis(250));

        let store = config.store_config();
        assert_eq!(store.cache_ttl, config.ttl);
        assert_eq!(store.cache_timeout, config.timeout);
    }

    #[test]
    fn test_build_backends() {
        let disabled = CacheConfig::default().build_backend().unwrap();
        assert!(!disabled.is_available());

        let memory = CacheConfig {
            kind: CacheKind::Memory,
            ..CacheConfig::default()
        };
        assert!(memory.build_backend().unwrap().is_available());

        let bad_redis = CacheConfig {
            kind: CacheKind::Redis {
                url: "not a url".to_string(),
                prefix: "pactbot".to_string(),
            },
            ..CacheConfig::default()
        };
        assert!(bad_redis.build_backend().is_err());
    }

    #[test]
    fn test_broken_cache_falls_back_to_disabled() {
        let bad_redis = CacheConfig {
            kind: CacheKind::Redis {
                url: "not a url".to_string(),
                prefix: "pactbot".to_string(),
            },
            ..CacheConfig::default()
        };
        assert!(!bad_redis.backend_or_disabled().is_available());

        let memory = CacheConfig {
            kind: CacheKind::Memory,
            ..CacheConfig::default()
        };
        assert!(memory.backend_or_disabled().is_available());
    }

    #[test]
    fn test_debug_hides_redis_url() {
        let config = CacheConfig {
            kind: CacheKind::Redis {
                url: "redis://:hunter2@cache:6379".to_string(),
                prefix: "pactbot".to_string(),
            },
            ..CacheConfig::default()
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}

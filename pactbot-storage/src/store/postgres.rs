//! PostgreSQL record store.
//!
//! Records live in one table keyed by id, with the owner and creation time
//! broken out for filtering and ordering. The full record is kept as JSONB
//! in `document`, in the same shape the cache holds.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime};
use pactbot_core::{ContractId, ContractRecord, OwnerId, StorageError};
use serde_json::Value as JsonValue;
use tokio_postgres::{NoTls, Row};

use super::traits::RecordStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS contract_analyses (
    id          TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL,
    document    JSONB NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS contract_analyses_owner_created_idx
    ON contract_analyses (owner_id, created_at DESC);
";

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// How long to wait for a pooled connection
    pub timeout: Duration,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("max_size", &self.max_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "pactbot".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            max_size: 16,
            timeout: Duration::from_secs(5),
        }
    }
}

impl DbConfig {
    /// Read `PACTBOT_DB_*` variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("PACTBOT_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("PACTBOT_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("PACTBOT_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("PACTBOT_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("PACTBOT_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("PACTBOT_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: std::env::var("PACTBOT_DB_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Create a connection pool from this configuration. Does not connect.
    pub fn create_pool(&self) -> Result<Pool, StorageError> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        pool_cfg.timeouts.create = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StorageError::Unavailable {
                reason: format!("failed to create pool: {e}"),
            })
    }
}

// ============================================================================
// RECORD STORE
// ============================================================================

/// Record store backed by a deadpool-managed PostgreSQL pool.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: Pool,
}

impl PgRecordStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &DbConfig) -> Result<Self, StorageError> {
        Ok(Self::new(config.create_pool()?))
    }

    /// Current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Create the table and index if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn().await?;
        conn.batch_execute(SCHEMA).await.map_err(query_failed)
    }

    async fn conn(&self) -> Result<deadpool_postgres::Object, StorageError> {
        self.pool.get().await.map_err(unavailable)
    }
}

fn unavailable(e: PoolError) -> StorageError {
    StorageError::Unavailable {
        reason: e.to_string(),
    }
}

fn query_failed(e: tokio_postgres::Error) -> StorageError {
    // A dropped connection mid-query is as good as no connection.
    if e.is_closed() {
        return StorageError::Unavailable {
            reason: e.to_string(),
        };
    }
    StorageError::QueryFailed {
        reason: e.to_string(),
    }
}

fn decode_row(row: &Row) -> Result<ContractRecord, StorageError> {
    let id: String = row.get("id");
    let document: JsonValue = row.get("document");
    serde_json::from_value(document).map_err(|e| StorageError::Corrupt {
        id,
        reason: e.to_string(),
    })
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert(&self, record: &ContractRecord) -> Result<(), StorageError> {
        let document = serde_json::to_value(record).map_err(|e| StorageError::InsertFailed {
            id: record.id.to_string(),
            reason: e.to_string(),
        })?;
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO contract_analyses (id, owner_id, document, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE
                SET owner_id = EXCLUDED.owner_id,
                    document = EXCLUDED.document,
                    updated_at = EXCLUDED.updated_at",
            &[
                &record.id.as_str(),
                &record.owner.as_str(),
                &document,
                &record.created_at,
                &record.updated_at,
            ],
        )
        .await
        .map_err(|e| StorageError::InsertFailed {
            id: record.id.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    async fn find_owned(
        &self,
        id: &ContractId,
        owner: &OwnerId,
    ) -> Result<Option<ContractRecord>, StorageError> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT id, document FROM contract_analyses WHERE id = $1 AND owner_id = $2",
                &[&id.as_str(), &owner.as_str()],
            )
            .await
            .map_err(query_failed)?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn delete_owned(&self, id: &ContractId, owner: &OwnerId) -> Result<bool, StorageError> {
        let conn = self.conn().await?;
        let deleted = conn
            .execute(
                "DELETE FROM contract_analyses WHERE id = $1 AND owner_id = $2",
                &[&id.as_str(), &owner.as_str()],
            )
            .await
            .map_err(query_failed)?;
        Ok(deleted > 0)
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ContractRecord>, StorageError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT id, document FROM contract_analyses
                 WHERE owner_id = $1
                 ORDER BY created_at DESC",
                &[&owner.as_str()],
            )
            .await
            .map_err(query_failed)?;
        rows.iter().map(decode_row).collect()
    }

    async fn ping(&self) -> Result<(), StorageError> {
        let conn = self.conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(query_failed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let config = DbConfig {
            password: "s3cret".to_string(),
            ..DbConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_pool_creation_does_not_connect() {
        let store = PgRecordStore::from_config(&DbConfig::default()).unwrap();
        assert_eq!(store.pool_size(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_database_is_unavailable() {
        let config = DbConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            timeout: Duration::from_millis(200),
            ..DbConfig::default()
        };
        let store = PgRecordStore::from_config(&config).unwrap();
        let err = store.ping().await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
    }
}

//! Error types for PactBot operations

use std::time::Duration;

use thiserror::Error;

/// Durable store errors.
///
/// A missing record is not an error at this layer; lookups return `Option`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Insert failed for contract {id}: {reason}")]
    InsertFailed { id: String, reason: String },

    #[error("Stored record {id} could not be decoded: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Cache layer errors.
///
/// These never reach a caller of the record store: they are absorbed and
/// treated as a miss (reads) or a no-op (writes).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache is not configured")]
    Disabled,

    #[error("Cache {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Cache backend error: {reason}")]
    Backend { reason: String },

    #[error("Cache entry {key} is unreadable: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Validation errors for incoming analyses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors surfaced by the record store to its callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    /// No record matches `(id, owner)`. Deliberately carries no detail.
    #[error("Contract not found")]
    NotFound,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),

    #[error("Invalid contract: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type alias for record store operations.
pub type RecordResult<T> = Result<T, RecordError>;

// =============================================================================
// TESTS
// =============================================================================

//! Durable record store trait.

use async_trait::async_trait;
use pactbot_core::{ContractId, ContractRecord, OwnerId, StorageError};

/// The source of truth for contract records.
///
/// Every lookup and delete is scoped to an owner: a record that exists but
/// belongs to someone else is indistinguishable from one that does not exist.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert `record`, replacing any row with the same id.
    async fn insert(&self, record: &ContractRecord) -> Result<(), StorageError>;

    /// Find the record with `id` owned by `owner`.
    async fn find_owned(
        &self,
        id: &ContractId,
        owner: &OwnerId,
    ) -> Result<Option<ContractRecord>, StorageError>;

    /// Delete the record with `id` owned by `owner`.
    ///
    /// Returns `false` when nothing matched, which includes the row having
    /// been deleted concurrently.
    async fn delete_owned(&self, id: &ContractId, owner: &OwnerId) -> Result<bool, StorageError>;

    /// All records owned by `owner`, newest first.
    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ContractRecord>, StorageError>;

    /// Cheap connectivity check.
    async fn ping(&self) -> Result<(), StorageError>;
}

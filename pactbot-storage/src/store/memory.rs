//! In-memory record store for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use pactbot_core::{ContractId, ContractRecord, OwnerId, StorageError};
use tokio::sync::RwLock;

use super::traits::RecordStore;

/// Record store backed by a `HashMap`. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<ContractId, ContractRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Whether a record with `id` exists for any owner.
    pub async fn contains(&self, id: &ContractId) -> bool {
        self.records.read().await.contains_key(id)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, record: &ContractRecord) -> Result<(), StorageError> {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn find_owned(
        &self,
        id: &ContractId,
        owner: &OwnerId,
    ) -> Result<Option<ContractRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .get(id)
            .filter(|record| record.is_owned_by(owner))
            .cloned())
    }

    async fn delete_owned(&self, id: &ContractId, owner: &OwnerId) -> Result<bool, StorageError> {
        let mut records = self.records.write().await;
        match records.get(id) {
            Some(record) if record.is_owned_by(owner) => {
                records.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ContractRecord>, StorageError> {
        let records = self.records.read().await;
        let mut owned: Vec<ContractRecord> = records
            .values()
            .filter(|record| record.is_owned_by(owner))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

//! PactBot Test Utilities
//!
//! Centralized test infrastructure for the PactBot workspace:
//! - Fault-injecting record store and cache doubles
//! - Proptest generators for record types
//! - Test fixtures for common scenarios
//! - Assertions for record store results

pub use pactbot_core::{
    CacheError, ContractAnalysis, ContractId, ContractRecord, Level, NegotiationPoint,
    NewContract, Opportunity, OwnerId, RecordError, RecordResult, Risk, StorageError, Timestamp,
};
pub use pactbot_storage::{
    CacheBackend, CacheKey, ContractStore, InMemoryCache, InMemoryRecordStore, RecordStore,
    StoreConfig,
};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

// ============================================================================
// FAULT-INJECTING DOUBLES
// ============================================================================

/// In-memory record store that can be switched into a failing state.
///
/// While failing, every call returns [`StorageError::Unavailable`] and the
/// stored data is left untouched, so switching back restores it.
#[derive(Debug, Default)]
pub struct FlakyRecordStore {
    inner: InMemoryRecordStore,
    failing: AtomicBool,
    finds: AtomicUsize,
}

impl FlakyRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `find_owned` calls that reached the store.
    pub fn find_calls(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                reason: "injected store failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FlakyRecordStore {
    async fn insert(&self, record: &ContractRecord) -> Result<(), StorageError> {
        self.check()?;
        self.inner.insert(record).await
    }

    async fn find_owned(
        &self,
        id: &ContractId,
        owner: &OwnerId,
    ) -> Result<Option<ContractRecord>, StorageError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.find_owned(id, owner).await
    }

    async fn delete_owned(&self, id: &ContractId, owner: &OwnerId) -> Result<bool, StorageError> {
        self.check()?;
        self.inner.delete_owned(id, owner).await
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ContractRecord>, StorageError> {
        self.check()?;
        self.inner.list_by_owner(owner).await
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.check()
    }
}

/// Record store whose delete always reports the row as already gone,
/// as if a concurrent request deleted it after the ownership check.
#[derive(Debug, Default)]
pub struct RacingDeleteStore {
    inner: InMemoryRecordStore,
}

impl RacingDeleteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for RacingDeleteStore {
    async fn insert(&self, record: &ContractRecord) -> Result<(), StorageError> {
        self.inner.insert(record).await
    }

    async fn find_owned(
        &self,
        id: &ContractId,
        owner: &OwnerId,
    ) -> Result<Option<ContractRecord>, StorageError> {
        self.inner.find_owned(id, owner).await
    }

    async fn delete_owned(&self, id: &ContractId, owner: &OwnerId) -> Result<bool, StorageError> {
        self.inner.delete_owned(id, owner).await?;
        Ok(false)
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ContractRecord>, StorageError> {
        self.inner.list_by_owner(owner).await
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Cache that claims to be configured but fails every call, like an
/// unreachable server or rejected credentials.
#[derive(Debug, Default)]
pub struct FailingCache {
    calls: AtomicUsize,
}

impl FailingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Backend {
            reason: "connection refused".to_string(),
        })
    }
}

#[async_trait]
impl CacheBackend for FailingCache {
    fn is_available(&self) -> bool {
        true
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.fail()
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
        self.fail()
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        self.fail()
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.fail()
    }
}

/// Cache whose calls never complete.
#[derive(Debug, Default, Clone, Copy)]
pub struct HangingCache;

#[async_trait]
impl CacheBackend for HangingCache {
    fn is_available(&self) -> bool {
        true
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        std::future::pending().await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        std::future::pending().await
    }
}

/// Build a [`ContractStore`] over the given backends with a short cache
/// timeout suited to tests.
pub fn contract_store(
    records: Arc<dyn RecordStore>,
    cache: Arc<dyn CacheBackend>,
) -> ContractStore {
    let config = StoreConfig::default().with_timeout(Duration::from_millis(50));
    ContractStore::new(records, cache, config)
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating PactBot record types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a non-blank identifier-like string.
    pub fn arb_ident() -> impl Strategy<Value = String> {
        "[a-z0-9]{1,16}"
    }

    pub fn arb_contract_id() -> impl Strategy<Value = ContractId> {
        arb_ident().prop_map(ContractId::from)
    }

    pub fn arb_owner_id() -> impl Strategy<Value = OwnerId> {
        arb_ident().prop_map(|s| OwnerId::new(format!("user-{s}")))
    }

    pub fn arb_level() -> impl Strategy<Value = Level> {
        prop_oneof![Just(Level::Low), Just(Level::Medium), Just(Level::High)]
    }

    /// Generate free text that is never blank.
    pub fn arb_text() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 ,.]{0,60}"
    }

    pub fn arb_risk() -> impl Strategy<Value = Risk> {
        (arb_text(), arb_level(), arb_ident()).prop_map(|(description, severity, category)| Risk {
            description,
            severity,
            category,
        })
    }

    pub fn arb_opportunity() -> impl Strategy<Value = Opportunity> {
        (arb_text(), arb_level(), arb_ident()).prop_map(|(description, impact, category)| {
            Opportunity {
                description,
                impact,
                category,
            }
        })
    }

    pub fn arb_negotiation_point() -> impl Strategy<Value = NegotiationPoint> {
        (arb_text(), arb_level(), arb_ident()).prop_map(|(description, priority, category)| {
            NegotiationPoint {
                description,
                priority,
                category,
            }
        })
    }

    /// Generate a valid analysis (score within range, no blank fields).
    pub fn arb_analysis() -> impl Strategy<Value = ContractAnalysis> {
        (
            arb_text(),
            prop::collection::vec(arb_risk(), 0..4),
            prop::collection::vec(arb_opportunity(), 0..4),
            prop::collection::vec(arb_negotiation_point(), 0..4),
            0u8..=100,
        )
            .prop_map(
                |(summary, risks, opportunities, negotiation_points, overall_score)| {
                    ContractAnalysis {
                        summary,
                        risks,
                        opportunities,
                        negotiation_points,
                        overall_score,
                    }
                },
            )
    }

    /// Generate a valid submission.
    pub fn arb_new_contract() -> impl Strategy<Value = NewContract> {
        (
            arb_text(),
            prop_oneof![
                Just("Employment".to_string()),
                Just("Lease".to_string()),
                Just("NDA".to_string()),
                Just("Service Agreement".to_string()),
            ],
            arb_analysis(),
            prop::option::of(prop_oneof![Just("en".to_string()), Just("de".to_string())]),
        )
            .prop_map(|(contract_text, contract_type, analysis, language)| NewContract {
                contract_text,
                contract_type,
                analysis,
                language,
                ai_model: None,
            })
    }

    /// Generate a stored record for `owner`.
    pub fn arb_record(owner: OwnerId) -> impl Strategy<Value = ContractRecord> {
        (arb_contract_id(), arb_new_contract()).prop_map(move |(id, new)| {
            let mut record = super::fixtures::record_from(owner.clone(), new);
            record.id = id;
            record
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common test scenarios.

    use super::*;
    use chrono::Utc;
    use pactbot_core::{DEFAULT_AI_MODEL, DEFAULT_LANGUAGE};

    /// An employment-contract analysis scoring 80 with one risk of each
    /// severity.
    pub fn new_contract() -> NewContract {
        NewContract {
            contract_text: "This Employment Agreement is entered into by and between..."
                .to_string(),
            contract_type: "Employment".to_string(),
            analysis: ContractAnalysis {
                summary: "Standard employment agreement with a broad non-compete.".to_string(),
                risks: vec![
                    Risk {
                        description: "Non-compete covers all competitors for 2 years".to_string(),
                        severity: Level::High,
                        category: "legal".to_string(),
                    },
                    Risk {
                        description: "Notice period is asymmetric".to_string(),
                        severity: Level::Medium,
                        category: "term".to_string(),
                    },
                    Risk {
                        description: "Expense policy referenced but not attached".to_string(),
                        severity: Level::Low,
                        category: "financial".to_string(),
                    },
                ],
                opportunities: vec![Opportunity {
                    description: "Signing bonus is negotiable".to_string(),
                    impact: Level::Medium,
                    category: "financial".to_string(),
                }],
                negotiation_points: vec![NegotiationPoint {
                    description: "Limit non-compete to direct competitors".to_string(),
                    priority: Level::High,
                    category: "legal".to_string(),
                }],
                overall_score: 80,
            },
            language: None,
            ai_model: None,
        }
    }

    /// Build a record from a submission without validation.
    pub fn record_from(owner: OwnerId, new: NewContract) -> ContractRecord {
        let now = Utc::now();
        ContractRecord {
            id: ContractId::generate(),
            owner,
            contract_text: new.contract_text,
            contract_type: new.contract_type,
            analysis: new.analysis,
            language: new.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            ai_model: new.ai_model.unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    /// The fixture record with a fixed `id` and `owner`.
    pub fn record(id: &str, owner: &str) -> ContractRecord {
        let mut record = record_from(OwnerId::new(owner), new_contract());
        record.id = ContractId::new(id);
        record
    }

    /// Record `abc123` owned by `u1`.
    pub fn abc123() -> ContractRecord {
        record("abc123", "u1")
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for record store results.

    use super::*;

    /// Assert that a result is `NotFound`.
    pub fn assert_not_found<T: std::fmt::Debug>(result: &RecordResult<T>) {
        assert!(
            matches!(result, Err(RecordError::NotFound)),
            "Expected NotFound, got {:?}",
            result
        );
    }

    /// Assert that a result is a durable store failure.
    pub fn assert_store_unavailable<T: std::fmt::Debug>(result: &RecordResult<T>) {
        assert!(
            matches!(result, Err(RecordError::StoreUnavailable(_))),
            "Expected StoreUnavailable, got {:?}",
            result
        );
    }

    /// Assert that a result is a validation failure.
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &RecordResult<T>) {
        assert!(
            matches!(result, Err(RecordError::Validation(_))),
            "Expected Validation error, got {:?}",
            result
        );
    }

    /// Assert that `cache` holds exactly the serialized form of `record`.
    pub async fn assert_cached(cache: &InMemoryCache, record: &ContractRecord) {
        let key = CacheKey::record(&record.id);
        let cached = cache
            .get(key.as_str())
            .await
            .expect("in-memory cache never fails")
            .unwrap_or_else(|| panic!("expected {key} to be cached"));
        let expected = serde_json::to_vec(record).expect("records serialize");
        assert_eq!(cached, expected, "cache entry for {key} differs from record");
    }
}

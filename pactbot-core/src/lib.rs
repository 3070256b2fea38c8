//! PactBot Core - Contract Record Types
//!
//! Data types shared by the storage and API layers: record identity, the
//! contract analysis payload, and the error taxonomy.

pub mod error;
pub mod identity;
pub mod record;

pub use error::{CacheError, RecordError, RecordResult, StorageError, ValidationError};
pub use identity::{ContractId, OwnerId, Timestamp};
pub use record::{
    ContractAnalysis, ContractRecord, Level, NegotiationPoint, NewContract, Opportunity, Risk,
    DEFAULT_AI_MODEL, DEFAULT_CATEGORY, DEFAULT_LANGUAGE, MAX_OVERALL_SCORE,
};

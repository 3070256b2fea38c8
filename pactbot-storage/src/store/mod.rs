//! Durable record stores.

mod memory;
mod postgres;
mod traits;

pub use memory::InMemoryRecordStore;
pub use postgres::{DbConfig, PgRecordStore};
pub use traits::RecordStore;

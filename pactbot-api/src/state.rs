//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use pactbot_storage::ContractStore;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Cache-aside record store. Handlers never talk to the cache or the
    /// database directly.
    pub store: Arc<ContractStore>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: ContractStore) -> Self {
        Self {
            store: Arc::new(store),
            start_time: Instant::now(),
        }
    }
}

impl FromRef<AppState> for Arc<ContractStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Instant {
    fn from_ref(state: &AppState) -> Self {
        state.start_time
    }
}

//! In-memory backend for the sync state.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{StateStorage, SyncState};
use crate::errors::StateError;

/// Keeps the state in process memory. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<SyncState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: SyncState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn retrieve_state(&self) -> Result<SyncState, StateError> {
        Ok(self.state.lock().await.clone())
    }

    async fn save_state(&self, state: &SyncState) -> Result<(), StateError> {
        *self.state.lock().await = state.clone();
        Ok(())
    }
}

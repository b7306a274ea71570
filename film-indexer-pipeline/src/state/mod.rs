//! Persisted sync progress.
//!
//! [`SyncState`] holds the watermark of the last fully committed run and the
//! ids already delivered by the current, uncommitted run. It is the only
//! durable side effect of the pipeline.
//!
//! [`StateStorage`] is the persistence backend; [`StateStore`] applies each
//! operation as a full read-modify-write through it.

mod json_file;
mod memory;
mod timestamp;

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::errors::StateError;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

/// The watermark used before any run has committed.
pub fn initial_watermark() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Sync progress as persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// Everything modified at or before this instant is in the index.
    #[serde(
        rename = "last_etl_process_time",
        with = "timestamp",
        default = "initial_watermark"
    )]
    pub last_successful_watermark: DateTime<Utc>,

    /// Ids loaded by the current run before it has committed.
    #[serde(default, alias = "previous_extracted_ids")]
    pub pending_loaded_ids: BTreeSet<Uuid>,

    /// Start of the earliest attempt that contributed to `pending_loaded_ids`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_since: Option<DateTime<Utc>>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            last_successful_watermark: initial_watermark(),
            pending_loaded_ids: BTreeSet::new(),
            pending_since: None,
        }
    }
}

/// Durable backend for [`SyncState`].
///
/// Implementations must make `save_state` atomic: a concurrent reader sees
/// either the previous or the new state, never a mix.
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Load the persisted state, or the first-run default if none exists.
    async fn retrieve_state(&self) -> Result<SyncState, StateError>;

    /// Replace the persisted state.
    async fn save_state(&self, state: &SyncState) -> Result<(), StateError>;
}

/// Watermark and pending-id operations over a [`StateStorage`].
///
/// Every mutation reads the full state, applies the change and writes the
/// full state back. Only one sync process writes at a time.
pub struct StateStore {
    storage: Box<dyn StateStorage>,
}

impl StateStore {
    pub fn new(storage: Box<dyn StateStorage>) -> Self {
        Self { storage }
    }

    /// Snapshot of the whole state.
    pub async fn get_state(&self) -> Result<SyncState, StateError> {
        self.storage.retrieve_state().await
    }

    pub async fn get_watermark(&self) -> Result<DateTime<Utc>, StateError> {
        Ok(self.get_state().await?.last_successful_watermark)
    }

    /// Store a new watermark. The stored value never moves backwards.
    pub async fn set_watermark(&self, watermark: DateTime<Utc>) -> Result<(), StateError> {
        self.update(|state| {
            if watermark > state.last_successful_watermark {
                state.last_successful_watermark = watermark;
            }
        })
        .await
    }

    pub async fn get_pending_loaded_ids(&self) -> Result<BTreeSet<Uuid>, StateError> {
        Ok(self.get_state().await?.pending_loaded_ids)
    }

    /// Record ids delivered by the attempt that started at `attempt_started_at`.
    pub async fn append_pending_loaded_ids<I>(
        &self,
        ids: I,
        attempt_started_at: DateTime<Utc>,
    ) -> Result<(), StateError>
    where
        I: IntoIterator<Item = Uuid> + Send,
    {
        let ids: Vec<Uuid> = ids.into_iter().collect();
        if ids.is_empty() {
            return Ok(());
        }

        self.update(move |state| {
            state.pending_loaded_ids.extend(ids);
            let since = state.pending_since.get_or_insert(attempt_started_at);
            if attempt_started_at < *since {
                *since = attempt_started_at;
            }
        })
        .await
    }

    /// Forget the pending ids once the run has committed its watermark.
    pub async fn clear_pending_loaded_ids(&self) -> Result<(), StateError> {
        self.update(|state| {
            state.pending_loaded_ids.clear();
            state.pending_since = None;
        })
        .await
    }

    async fn update<F>(&self, apply: F) -> Result<(), StateError>
    where
        F: FnOnce(&mut SyncState) + Send,
    {
        let mut state = self.storage.retrieve_state().await?;
        apply(&mut state);
        self.storage.save_state(&state).await?;
        debug!(
            watermark = %state.last_successful_watermark,
            pending = state.pending_loaded_ids.len(),
            "Sync state saved"
        );
        Ok(())
    }
}

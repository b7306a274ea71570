//! JSON file backend for the sync state.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use super::{StateStorage, SyncState};
use crate::errors::StateError;

/// Stores the state as a single JSON document on disk.
///
/// A missing file means first run. Writes go to a sibling temporary file that
/// is then renamed over the target.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStorage for JsonFileStorage {
    async fn retrieve_state(&self) -> Result<SyncState, StateError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No state file, starting from scratch");
                Ok(SyncState::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save_state(&self, state: &SyncState) -> Result<(), StateError> {
        let contents = serde_json::to_vec_pretty(state)?;
        let temp_path = self.temp_path();

        tokio::fs::write(&temp_path, contents).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}

//! Film catalog indexer binary support.
//!
//! Settings, component wiring and subscriber set-up for the `film-indexer`
//! process. The sync pass itself lives in `film-indexer-pipeline`.

pub mod config;
pub mod telemetry;

pub use config::{Dependencies, Settings};

use thiserror::Error;

/// Errors that stop the process before or outside the sync loop.
///
/// Failures inside a sync pass never surface here; the scheduler absorbs them.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// A setting is missing or cannot be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The search client could not be built from the configured URL.
    #[error("Search client error: {0}")]
    SearchClient(#[from] film_indexer_repository::SearchError),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// Listening for the shutdown signal failed.
    #[error("Signal handler error: {0}")]
    Signal(#[from] std::io::Error),
}

impl IndexingError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

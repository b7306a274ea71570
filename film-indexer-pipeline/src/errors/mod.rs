//! Error types for the film indexer pipeline.

use film_indexer_repository::SearchError;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in the film indexer pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error from the loader component.
    #[error("Loader error: {0}")]
    LoaderError(String),

    /// Error from the search engine.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchError),

    /// Error from the relational source.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// Error reading or writing the persisted sync state.
    #[error("State error: {0}")]
    StateError(#[from] StateError),
}

impl PipelineError {
    /// Create a loader error.
    pub fn loader(msg: impl Into<String>) -> Self {
        Self::LoaderError(msg.into())
    }
}

/// Errors raised by the state store.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid state file: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A raw row that cannot become a search document.
///
/// Affects only that row; the rest of the batch is still loaded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// A required field is absent.
    #[error("Row {position} (id {id:?}) is missing required field `{field}`")]
    MissingField {
        /// Position of the row within its batch.
        position: usize,
        /// The row id, when present.
        id: Option<Uuid>,
        field: &'static str,
    },
}

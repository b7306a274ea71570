//! Loader module for the film indexer pipeline.
//!
//! Writes transformed documents into the search index.

use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::errors::PipelineError;
use film_indexer_repository::{IndexStatus, SearchEngineClient, SearchError};
use film_indexer_shared::SearchDocument;

/// Loader that upserts documents into the search engine.
///
/// The loader is responsible for:
/// - Creating the index on first use
/// - Checking the engine is reachable before each bulk request
/// - Failing the whole batch when any document is rejected
///
/// It never retries; retry policy belongs to the caller.
pub struct SearchLoader {
    client: Arc<dyn SearchEngineClient>,
}

impl SearchLoader {
    /// Create a new search loader with the given client.
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self { client }
    }

    /// Ensure the search index exists. Safe to call repeatedly.
    #[instrument(skip(self))]
    pub async fn ensure_index(&self) -> Result<IndexStatus, PipelineError> {
        let status = self.client.ensure_index_exists().await?;
        match status {
            IndexStatus::Created => info!("Created search index"),
            IndexStatus::AlreadyExists => debug!("Search index already exists"),
        }
        Ok(status)
    }

    /// Check if the search engine is healthy.
    pub async fn health_check(&self) -> Result<bool, PipelineError> {
        Ok(self.client.health_check().await?)
    }

    /// Upsert `docs` in one bulk request and return the ids written.
    ///
    /// Documents are keyed by film work id, so loading the same batch twice
    /// leaves the index unchanged.
    #[instrument(skip(self, docs), fields(count = docs.len()))]
    pub async fn load(&self, docs: &[SearchDocument]) -> Result<Vec<Uuid>, PipelineError> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        if !self.health_check().await? {
            return Err(SearchError::unavailable("search engine did not answer ping").into());
        }

        let summary = self.client.bulk_upsert(docs).await?;
        if !summary.is_complete() {
            let reason = summary.first_error().unwrap_or("unknown reason");
            error!(
                failed = summary.failed,
                total = summary.total,
                reason = reason,
                "Bulk upsert rejected documents"
            );
            return Err(PipelineError::loader(format!(
                "Failed to index {} of {} documents: {}",
                summary.failed, summary.total, reason
            )));
        }

        debug!(count = summary.succeeded, "Successfully indexed documents");
        Ok(docs.iter().map(|doc| doc.id).collect())
    }
}

//! Search engine client trait definition.
//!
//! This module defines the abstract interface for search engine operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch,
//! in-memory).

use async_trait::async_trait;

use crate::errors::SearchError;
use crate::types::{BulkUpsertSummary, IndexStatus};
use film_indexer_shared::SearchDocument;

/// Abstract interface for search engine operations.
///
/// This trait defines the operations the sync engine needs from a search
/// engine. Implementations can be swapped for different backends (OpenSearch,
/// mock, etc.) enabling easy testing.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Check if the search engine is reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the search engine answered the ping
    /// * `Ok(false)` - If it answered with a failure status
    /// * `Err(SearchError)` - If the ping could not be sent
    async fn health_check(&self) -> Result<bool, SearchError>;

    /// Ensure the search index exists with the fixed film schema.
    ///
    /// Creates the index only if it is absent, so calling this repeatedly is
    /// safe.
    async fn ensure_index_exists(&self) -> Result<IndexStatus, SearchError>;

    /// Insert or replace documents in a single bulk request, keyed by
    /// [`SearchDocument::id`].
    ///
    /// # Returns
    ///
    /// * `Ok(BulkUpsertSummary)` - Per-document results; individual failures
    ///   are reported here, not as `Err`
    /// * `Err(SearchError)` - If the request as a whole failed
    async fn bulk_upsert(
        &self,
        documents: &[SearchDocument],
    ) -> Result<BulkUpsertSummary, SearchError>;
}

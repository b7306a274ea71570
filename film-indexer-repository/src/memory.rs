//! In-memory search index.
//!
//! Keeps documents in a map keyed by document id, so it has the same
//! replace-on-write semantics as the real index. Used by tests and for local
//! runs without a search engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::errors::SearchError;
use crate::interfaces::SearchEngineClient;
use crate::types::{BulkItemResult, BulkUpsertSummary, IndexStatus};
use film_indexer_shared::SearchDocument;

#[derive(Debug, Default)]
struct Inner {
    index_created: bool,
    documents: BTreeMap<String, SearchDocument>,
}

/// Search index held in process memory.
///
/// Cloning shares the underlying storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySearchIndex {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.documents.len()
    }

    /// Fetch a stored document by id.
    pub async fn get(&self, document_id: &str) -> Option<SearchDocument> {
        self.inner.lock().await.documents.get(document_id).cloned()
    }

    /// All stored documents ordered by id.
    pub async fn documents(&self) -> Vec<SearchDocument> {
        self.inner.lock().await.documents.values().cloned().collect()
    }

    pub async fn index_created(&self) -> bool {
        self.inner.lock().await.index_created
    }
}

#[async_trait]
impl SearchEngineClient for MemorySearchIndex {
    async fn health_check(&self) -> Result<bool, SearchError> {
        Ok(true)
    }

    async fn ensure_index_exists(&self) -> Result<IndexStatus, SearchError> {
        let mut inner = self.inner.lock().await;
        if inner.index_created {
            return Ok(IndexStatus::AlreadyExists);
        }
        inner.index_created = true;
        Ok(IndexStatus::Created)
    }

    async fn bulk_upsert(
        &self,
        documents: &[SearchDocument],
    ) -> Result<BulkUpsertSummary, SearchError> {
        let mut inner = self.inner.lock().await;

        let results = documents
            .iter()
            .map(|doc| {
                let document_id = doc.document_id();
                inner.documents.insert(document_id.clone(), doc.clone());
                BulkItemResult {
                    document_id,
                    success: true,
                    error: None,
                }
            })
            .collect();

        Ok(BulkUpsertSummary::from_results(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_loading_same_document_twice_keeps_one_copy() {
        let index = MemorySearchIndex::new();
        let mut doc = SearchDocument::new(Uuid::new_v4(), "Solaris");
        doc.genre = vec!["Sci-Fi".to_string()];

        index.bulk_upsert(std::slice::from_ref(&doc)).await.unwrap();
        let once = index.documents().await;

        index.bulk_upsert(std::slice::from_ref(&doc)).await.unwrap();
        let twice = index.documents().await;

        assert_eq!(index.len().await, 1);
        assert_eq!(once, twice);
        assert_eq!(index.get(&doc.document_id()).await, Some(doc));
    }

    #[tokio::test]
    async fn test_ensure_index_is_repeatable() {
        let index = MemorySearchIndex::new();

        assert_eq!(index.ensure_index_exists().await.unwrap(), IndexStatus::Created);
        assert_eq!(
            index.ensure_index_exists().await.unwrap(),
            IndexStatus::AlreadyExists
        );
        assert!(index.index_created().await);
    }
}

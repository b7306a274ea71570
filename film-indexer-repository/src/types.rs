//! Request and response types for search index operations.

/// Outcome of `ensure_index_exists`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// The index was missing and has been created.
    Created,
    /// The index was already present; nothing was changed.
    AlreadyExists,
}

/// Result of a bulk operation for a single document.
///
/// Indicates whether the write of one document within a bulk request
/// succeeded and includes the engine's reason if it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemResult {
    /// The document id (the film work id).
    pub document_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Failure reason reported by the engine.
    pub error: Option<String>,
}

/// Summary of a bulk upsert containing aggregate statistics and individual results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkUpsertSummary {
    /// Total number of documents in the request.
    pub total: usize,
    /// Number of successful writes.
    pub succeeded: usize,
    /// Number of failed writes.
    pub failed: usize,
    /// Individual results for each document, in request order.
    pub results: Vec<BulkItemResult>,
}

impl BulkUpsertSummary {
    /// Build a summary from per-document results.
    pub fn from_results(results: Vec<BulkItemResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// True when every document was written.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    /// The first failure reason, if any, for log and error messages.
    pub fn first_error(&self) -> Option<&str> {
        self.results
            .iter()
            .find_map(|r| r.error.as_deref())
    }
}

//! # Film Indexer Repository
//!
//! This crate provides the search engine seam for the film indexer. It
//! includes the error types, the `SearchEngineClient` interface, a concrete
//! implementation for OpenSearch (wire-compatible with Elasticsearch), and an
//! in-memory index used by tests.

pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod types;

pub use errors::SearchError;
pub use interfaces::SearchEngineClient;
pub use memory::MemorySearchIndex;
pub use opensearch::{IndexConfig, OpenSearchClient};
pub use types::{BulkItemResult, BulkUpsertSummary, IndexStatus};

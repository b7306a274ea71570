//! OpenSearch implementation of the search engine client.
//!
//! This module provides a concrete implementation of `SearchEngineClient`
//! using OpenSearch as the backend. The calls used (ping, index exists,
//! index create, bulk) are shared with Elasticsearch.

mod bulk;
mod client;
mod index_config;

pub use client::OpenSearchClient;
pub use index_config::{get_index_settings, IndexConfig, ANALYZER_NAME, DEFAULT_INDEX_NAME};

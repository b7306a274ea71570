//! Error types for the film indexer repository.

mod search_error;

pub use search_error::SearchError;

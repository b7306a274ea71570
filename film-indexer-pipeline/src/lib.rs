//! # Film Indexer Pipeline
//!
//! This crate provides the incremental sync engine that copies changed film
//! works from the relational catalog into the search index.
//!
//! ## Architecture
//!
//! The pipeline follows the Extractor-Transformer-Loader pattern:
//!
//! 1. **Extractor**: Reads film works changed since the watermark, in batches
//! 2. **Transformer**: Turns raw rows into search documents
//! 3. **Loader**: Bulk-upserts documents into the search index
//! 4. **Supervisor**: Runs one full pass and commits progress to the state store
//! 5. **Scheduler**: Repeats the supervised pass on a fixed interval

pub mod backoff;
pub mod errors;
pub mod extractor;
pub mod loader;
pub mod scheduler;
pub mod state;
pub mod supervisor;
pub mod transformer;

pub use errors::{PipelineError, StateError, TransformError};

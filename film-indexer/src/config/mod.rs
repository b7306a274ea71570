//! Configuration module for the film indexer.

pub mod dependencies;
pub mod settings;

pub use dependencies::Dependencies;
pub use settings::{LogFormat, PostgresSettings, SearchSettings, Settings, SyncSettings};

//! Change-detection extractor.
//!
//! Reads film works whose own row, persons, genres or associations changed
//! after the watermark, as a lazy sequence of fully materialized batches in
//! ascending order of last modification.

mod postgres;
mod query;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::errors::PipelineError;
use film_indexer_shared::RawFilmWork;

pub use postgres::{PageCursor, PostgresExtractor};

/// Lazy, finite, single-use sequence of batches.
pub type BatchStream<'a> = BoxStream<'a, Result<Vec<RawFilmWork>, PipelineError>>;

/// Ids to leave out of an extraction because an earlier attempt of the same
/// run already delivered them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exclusion {
    pub ids: BTreeSet<Uuid>,
    /// Excluded ids are still extracted if their row changed after this time.
    pub unless_changed_after: Option<DateTime<Utc>>,
}

impl Exclusion {
    pub fn new(ids: BTreeSet<Uuid>, unless_changed_after: Option<DateTime<Utc>>) -> Self {
        Self {
            ids,
            unless_changed_after,
        }
    }

    /// Whether a row should be skipped under this exclusion.
    ///
    /// Without `unless_changed_after` nothing is skipped: there is no way to
    /// tell whether a listed row changed after it was loaded.
    pub fn excludes(&self, id: &Uuid, last_modified: DateTime<Utc>) -> bool {
        self.unless_changed_after
            .is_some_and(|since| last_modified <= since && self.ids.contains(id))
    }
}

/// Source of changed film works.
pub trait ChangeExtractor: Send + Sync {
    /// Stream the film works changed after `watermark`, skipping `exclusion`.
    ///
    /// Nothing is read until the stream is polled. The stream cannot be
    /// restarted; call `extract` again for a new pass.
    fn extract(&self, watermark: DateTime<Utc>, exclusion: Exclusion) -> BatchStream<'_>;
}

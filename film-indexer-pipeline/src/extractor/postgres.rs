//! Postgres implementation of the change-detection extractor.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::query::CHANGED_FILM_WORKS_PAGE;
use super::{BatchStream, ChangeExtractor, Exclusion};
use crate::errors::PipelineError;
use film_indexer_shared::{RawFilmWork, RawPersonLink};

/// How long a page query waits for a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Position after the last row of a page, in `(last_modified, id)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub last_modified: DateTime<Utc>,
    pub id: Uuid,
}

impl PageCursor {
    /// Cursor placed before every row changed after `watermark`.
    pub fn start(watermark: DateTime<Utc>) -> Self {
        Self {
            last_modified: watermark,
            id: Uuid::nil(),
        }
    }

    /// Cursor for the page after one of `page_len` rows ending at `last`.
    ///
    /// A page shorter than `page_size` is the final one.
    pub fn after_page(page_len: usize, page_size: usize, last: Option<Self>) -> Option<Self> {
        if page_len < page_size {
            return None;
        }
        last
    }
}

/// Row returned by [`CHANGED_FILM_WORKS_PAGE`].
#[derive(Debug, FromRow)]
struct FilmWorkRecord {
    id: Uuid,
    title: Option<String>,
    description: Option<String>,
    rating: Option<f64>,
    kind: Option<String>,
    created: Option<DateTime<Utc>>,
    modified: Option<DateTime<Utc>>,
    last_modified: DateTime<Utc>,
    persons: Json<Vec<RawPersonLink>>,
    genres: Vec<String>,
}

impl FilmWorkRecord {
    fn cursor(&self) -> PageCursor {
        PageCursor {
            last_modified: self.last_modified,
            id: self.id,
        }
    }
}

impl From<FilmWorkRecord> for RawFilmWork {
    fn from(record: FilmWorkRecord) -> Self {
        let kind = record.kind.as_deref().and_then(|k| match k.parse() {
            Ok(kind) => Some(kind),
            Err(e) => {
                debug!(id = %record.id, error = %e, "Ignoring film work type");
                None
            }
        });

        RawFilmWork {
            id: Some(record.id),
            title: record.title,
            description: record.description,
            rating: record.rating,
            kind,
            created: record.created,
            modified: record.modified,
            last_modified: Some(record.last_modified),
            persons: Some(record.persons.0),
            genres: Some(record.genres),
        }
    }
}

/// Reads changed film works from the catalog database.
///
/// Each batch is one bounded keyset query. The connection goes back to the
/// pool as soon as the page is read, so nothing stays open while a batch is
/// transformed and loaded.
pub struct PostgresExtractor {
    pool: PgPool,
    batch_size: usize,
}

impl PostgresExtractor {
    pub fn new(pool: PgPool, batch_size: usize) -> Self {
        Self { pool, batch_size }
    }

    /// Create an extractor whose single-connection pool connects on first use.
    pub fn connect_lazy(options: PgConnectOptions, batch_size: usize) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy_with(options);

        Self::new(pool, batch_size)
    }

    #[instrument(skip(self, excluded), fields(excluded = excluded.len()))]
    async fn fetch_page(
        &self,
        watermark: DateTime<Utc>,
        excluded: &[Uuid],
        unless_changed_after: Option<DateTime<Utc>>,
        cursor: PageCursor,
    ) -> Result<Vec<FilmWorkRecord>, PipelineError> {
        let records: Vec<FilmWorkRecord> = sqlx::query_as(CHANGED_FILM_WORKS_PAGE)
            .bind(watermark)
            .bind(excluded)
            .bind(unless_changed_after)
            .bind(cursor.last_modified)
            .bind(cursor.id)
            .bind(self.batch_size as i64)
            .fetch_all(&self.pool)
            .await?;

        info!(count = records.len(), "Extracted rows from Postgres");
        Ok(records)
    }
}

impl ChangeExtractor for PostgresExtractor {
    fn extract(&self, watermark: DateTime<Utc>, exclusion: Exclusion) -> BatchStream<'_> {
        let excluded: Arc<[Uuid]> = exclusion.ids.into_iter().collect();
        let unless_changed_after = exclusion.unless_changed_after;

        stream::try_unfold(Some(PageCursor::start(watermark)), move |cursor| {
            let excluded = Arc::clone(&excluded);
            async move {
                let Some(cursor) = cursor else {
                    return Ok::<_, PipelineError>(None);
                };

                let records = self
                    .fetch_page(watermark, &excluded, unless_changed_after, cursor)
                    .await?;
                if records.is_empty() {
                    return Ok(None);
                }

                let next = PageCursor::after_page(
                    records.len(),
                    self.batch_size,
                    records.last().map(FilmWorkRecord::cursor),
                );
                let batch: Vec<RawFilmWork> = records.into_iter().map(Into::into).collect();

                Ok(Some((batch, next)))
            }
        })
        .boxed()
    }
}

//! Film work transformer.
//!
//! Turns raw catalog rows into denormalized search documents.

use tracing::{debug, instrument};

use crate::errors::TransformError;
use film_indexer_shared::{PersonRef, PersonRole, RawFilmWork, SearchDocument};

/// Result of transforming one extracted batch.
#[derive(Debug, Default)]
pub struct TransformedBatch {
    /// Documents in extraction order.
    pub documents: Vec<SearchDocument>,
    /// Rows that could not become documents.
    pub rejected: Vec<TransformError>,
}

/// Maps raw film work rows to [`SearchDocument`]s. Pure, no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilmWorkTransformer;

impl FilmWorkTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Transform a batch of rows.
    ///
    /// A row missing its id or title is rejected on its own; the remaining
    /// rows are still transformed.
    #[instrument(skip(self, rows), fields(row_count = rows.len()))]
    pub fn transform_batch(&self, rows: Vec<RawFilmWork>) -> TransformedBatch {
        let mut batch = TransformedBatch {
            documents: Vec::with_capacity(rows.len()),
            rejected: Vec::new(),
        };

        for (position, row) in rows.into_iter().enumerate() {
            match self.transform_row(position, row) {
                Ok(doc) => batch.documents.push(doc),
                Err(e) => batch.rejected.push(e),
            }
        }

        debug!(
            documents = batch.documents.len(),
            rejected = batch.rejected.len(),
            "Transformed batch"
        );
        batch
    }

    /// Transform one row at `position` within its batch.
    pub fn transform_row(
        &self,
        position: usize,
        row: RawFilmWork,
    ) -> Result<SearchDocument, TransformError> {
        let id = row.id.ok_or(TransformError::MissingField {
            position,
            id: None,
            field: "id",
        })?;
        let title = row.title.ok_or(TransformError::MissingField {
            position,
            id: Some(id),
            field: "title",
        })?;

        let mut doc = SearchDocument::new(id, title);
        doc.imdb_rating = row.rating;
        doc.description = row.description;
        doc.genre = row.genres.unwrap_or_default();

        for link in row.persons.unwrap_or_default() {
            let (Some(person_id), Some(name), Some(role)) =
                (link.person_id, link.person_name.clone(), link.role())
            else {
                debug!(film_work_id = %id, link = ?link, "Skipping incomplete person link");
                continue;
            };

            match role {
                // Last director wins.
                PersonRole::Director => doc.director = name,
                PersonRole::Actor => {
                    doc.actors_names.push(name.clone());
                    doc.actors.push(PersonRef { id: person_id, name });
                }
                PersonRole::Writer => {
                    doc.writers_names.push(name.clone());
                    doc.writers.push(PersonRef { id: person_id, name });
                }
            }
        }

        Ok(doc)
    }
}

//! The denormalized search document.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A person reference kept alongside the flat name lists for faceted lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: Uuid,
    pub name: String,
}

/// Document stored in the search index, one per film work.
///
/// The document id equals the film work id, so writing the same work twice
/// replaces the earlier copy instead of adding a second one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: Uuid,
    pub imdb_rating: Option<f64>,
    /// Genre names.
    pub genre: Vec<String>,
    pub title: String,
    pub description: Option<String>,
    /// Single director name, empty when the work has none.
    pub director: String,
    pub actors_names: Vec<String>,
    pub writers_names: Vec<String>,
    pub actors: Vec<PersonRef>,
    pub writers: Vec<PersonRef>,
}

impl SearchDocument {
    /// Create a document with only the required fields set.
    pub fn new(id: Uuid, title: impl Into<String>) -> Self {
        Self {
            id,
            imdb_rating: None,
            genre: Vec::new(),
            title: title.into(),
            description: None,
            director: String::new(),
            actors_names: Vec::new(),
            writers_names: Vec::new(),
            actors: Vec::new(),
            writers: Vec::new(),
        }
    }

    /// The index primary key.
    pub fn document_id(&self) -> String {
        self.id.to_string()
    }
}

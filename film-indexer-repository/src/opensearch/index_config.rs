//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the film search index.

use serde_json::{json, Value};

/// Default name of the search index.
pub const DEFAULT_INDEX_NAME: &str = "movies";

/// Name of the custom two-language analyzer used by all text fields.
pub const ANALYZER_NAME: &str = "ru_en";

/// Identifies the target index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Name of the index documents are written to.
    pub name: String,
}

impl IndexConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_NAME)
    }
}

/// Get the index settings and mappings for the film search index.
///
/// The configuration includes:
/// - **ru_en analyzer**: lowercase, stop-word removal and stemming for English
///   and Russian
/// - **Keyword fields**: `id` and `genre` for exact lookups and facets
/// - **Nested person objects**: `actors` and `writers` as `{id, name}` pairs
///
/// The mapping is strict, so a document carrying an unknown field is rejected.
pub fn get_index_settings() -> Value {
    let analyzed_text = json!({
        "type": "text",
        "analyzer": ANALYZER_NAME
    });

    let person = json!({
        "type": "nested",
        "dynamic": "strict",
        "properties": {
            "id": { "type": "keyword" },
            "name": analyzed_text
        }
    });

    json!({
        "settings": {
            "refresh_interval": "1s",
            "analysis": {
                "filter": {
                    "english_stop": {
                        "type": "stop",
                        "stopwords": "_english_"
                    },
                    "english_stemmer": {
                        "type": "stemmer",
                        "language": "english"
                    },
                    "english_possessive_stemmer": {
                        "type": "stemmer",
                        "language": "possessive_english"
                    },
                    "russian_stop": {
                        "type": "stop",
                        "stopwords": "_russian_"
                    },
                    "russian_stemmer": {
                        "type": "stemmer",
                        "language": "russian"
                    }
                },
                "analyzer": {
                    ANALYZER_NAME: {
                        "tokenizer": "standard",
                        "filter": [
                            "lowercase",
                            "english_stop",
                            "english_stemmer",
                            "english_possessive_stemmer",
                            "russian_stop",
                            "russian_stemmer"
                        ]
                    }
                }
            }
        },
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": { "type": "keyword" },
                "imdb_rating": { "type": "float" },
                "genre": { "type": "keyword" },
                "title": {
                    "type": "text",
                    "analyzer": ANALYZER_NAME,
                    "fields": {
                        "raw": { "type": "keyword" }
                    }
                },
                "description": analyzed_text,
                "director": analyzed_text,
                "actors_names": analyzed_text,
                "writers_names": analyzed_text,
                "actors": person,
                "writers": person
            }
        }
    })
}

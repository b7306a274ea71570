//! # Film Indexer Shared
//!
//! Data types shared across the film indexer crates.
//!
//! - [`RawFilmWork`] is one aggregated row as the extractor reads it from the
//!   relational catalog.
//! - [`SearchDocument`] is the denormalized document written to the search index.

mod document;
mod film_work;

pub use document::{PersonRef, SearchDocument};
pub use film_work::{FilmWorkKind, PersonRole, RawFilmWork, RawPersonLink};

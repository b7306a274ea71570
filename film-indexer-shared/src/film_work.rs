//! Raw catalog rows produced by the change-detection extractor.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of a film work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilmWorkKind {
    Movie,
    /// Stored as `tv_show` by the catalog admin.
    #[serde(alias = "tv_show")]
    Series,
}

impl FromStr for FilmWorkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(Self::Movie),
            "series" | "tv_show" => Ok(Self::Series),
            other => Err(format!("unknown film work type: {}", other)),
        }
    }
}

/// The role a person plays in a film work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonRole {
    Director,
    Actor,
    Writer,
}

impl PersonRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Director => "director",
            Self::Actor => "actor",
            Self::Writer => "writer",
        }
    }
}

impl fmt::Display for PersonRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "director" => Ok(Self::Director),
            "actor" => Ok(Self::Actor),
            "writer" => Ok(Self::Writer),
            other => Err(format!("unknown person role: {}", other)),
        }
    }
}

/// One (person, role) association of a film work, as aggregated by the
/// extractor query.
///
/// All fields are optional so that a single malformed association never
/// fails decoding of the whole row; the transformer skips incomplete links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPersonLink {
    pub person_id: Option<Uuid>,
    pub person_name: Option<String>,
    /// Kept as text so unknown roles can be skipped instead of rejected.
    pub person_role: Option<String>,
}

impl RawPersonLink {
    pub fn new(person_id: Uuid, person_name: impl Into<String>, role: PersonRole) -> Self {
        Self {
            person_id: Some(person_id),
            person_name: Some(person_name.into()),
            person_role: Some(role.as_str().to_string()),
        }
    }

    /// Parsed role, or `None` if the role is missing or unknown.
    pub fn role(&self) -> Option<PersonRole> {
        self.person_role.as_deref().and_then(|r| r.parse().ok())
    }
}

/// A film work joined with its genres and persons.
///
/// `id` and `title` are required by the transformer; everything else may be
/// absent and defaults to empty in the resulting document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFilmWork {
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub kind: Option<FilmWorkKind>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    /// Greatest modification time over the work and everything it references.
    pub last_modified: Option<DateTime<Utc>>,
    pub persons: Option<Vec<RawPersonLink>>,
    pub genres: Option<Vec<String>>,
}

impl RawFilmWork {
    /// Create a row with the required fields set.
    pub fn new(id: Uuid, title: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn with_person(mut self, person_id: Uuid, name: impl Into<String>, role: PersonRole) -> Self {
        self.persons
            .get_or_insert_with(Vec::new)
            .push(RawPersonLink::new(person_id, name, role));
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genres.get_or_insert_with(Vec::new).push(genre.into());
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_film_work_kind_accepts_tv_show() {
        assert_eq!("tv_show".parse::<FilmWorkKind>(), Ok(FilmWorkKind::Series));
        assert_eq!("series".parse::<FilmWorkKind>(), Ok(FilmWorkKind::Series));
        assert_eq!("movie".parse::<FilmWorkKind>(), Ok(FilmWorkKind::Movie));
        assert!("cartoon".parse::<FilmWorkKind>().is_err());
    }

    #[test]
    fn test_person_link_deserializes_from_aggregate() {
        let json = r#"{
            "person_role": "director",
            "person_id": "550e8400-e29b-41d4-a716-446655440000",
            "person_name": "Jane Doe"
        }"#;

        let link: RawPersonLink = serde_json::from_str(json).unwrap();

        assert_eq!(link.role(), Some(PersonRole::Director));
        assert_eq!(link.person_name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_unknown_role_is_none() {
        let link = RawPersonLink {
            person_id: Some(Uuid::new_v4()),
            person_name: Some("Someone".to_string()),
            person_role: Some("producer".to_string()),
        };

        assert!(link.role().is_none());
    }
}

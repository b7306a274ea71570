//! Change detection against a live Postgres catalog.
//!
//! These tests are ignored by default. Run them with `cargo test -- --ignored`
//! and the following environment:
//! - `TESTS_DATABASE_HOST`: Postgres server hostname (required)
//! - `TESTS_DATABASE_PORT`: Postgres server port (required)
//! - `TESTS_DATABASE_USERNAME`: Database user (required)
//! - `TESTS_DATABASE_PASSWORD`: Database password (optional)
//! - `TESTS_DATABASE_NAME`: Database name, defaults to `postgres`
//!
//! The `content` tables are created if missing. Every test seeds its own rows
//! with timestamps past any earlier run and only asserts on those rows.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use futures::TryStreamExt;
use sqlx::postgres::{PgConnectOptions, PgPool};
use uuid::Uuid;

use film_indexer_pipeline::extractor::{ChangeExtractor, Exclusion, PostgresExtractor};
use film_indexer_shared::RawFilmWork;

const CATALOG_SCHEMA: &str = r#"
SELECT pg_advisory_xact_lock(7215301);
CREATE SCHEMA IF NOT EXISTS content;
CREATE TABLE IF NOT EXISTS content.film_work (
    id uuid PRIMARY KEY,
    title text NOT NULL,
    description text,
    creation_date date,
    file_path text,
    rating double precision,
    type text NOT NULL,
    created timestamptz,
    modified timestamptz
);
CREATE TABLE IF NOT EXISTS content.person (
    id uuid PRIMARY KEY,
    full_name text NOT NULL,
    created timestamptz,
    modified timestamptz
);
CREATE TABLE IF NOT EXISTS content.genre (
    id uuid PRIMARY KEY,
    name text NOT NULL,
    description text,
    created timestamptz,
    modified timestamptz
);
CREATE TABLE IF NOT EXISTS content.person_film_work (
    id uuid PRIMARY KEY,
    film_work_id uuid NOT NULL REFERENCES content.film_work (id) ON DELETE CASCADE,
    person_id uuid NOT NULL REFERENCES content.person (id) ON DELETE CASCADE,
    role text NOT NULL,
    created timestamptz
);
CREATE TABLE IF NOT EXISTS content.genre_film_work (
    id uuid PRIMARY KEY,
    film_work_id uuid NOT NULL REFERENCES content.film_work (id) ON DELETE CASCADE,
    genre_id uuid NOT NULL REFERENCES content.genre (id) ON DELETE CASCADE,
    created timestamptz
);
"#;

fn connect_options() -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&std::env::var("TESTS_DATABASE_HOST").expect("TESTS_DATABASE_HOST must be set"))
        .port(
            std::env::var("TESTS_DATABASE_PORT")
                .expect("TESTS_DATABASE_PORT must be set")
                .parse()
                .expect("TESTS_DATABASE_PORT must be a valid port number"),
        )
        .username(
            &std::env::var("TESTS_DATABASE_USERNAME").expect("TESTS_DATABASE_USERNAME must be set"),
        )
        .database(
            &std::env::var("TESTS_DATABASE_NAME").unwrap_or_else(|_| "postgres".to_string()),
        );
    if let Ok(password) = std::env::var("TESTS_DATABASE_PASSWORD") {
        options = options.password(&password);
    }
    options
}

async fn catalog() -> PgPool {
    let pool = PgPool::connect_with(connect_options())
        .await
        .expect("Failed to connect to the test database");
    sqlx::raw_sql(CATALOG_SCHEMA)
        .execute(&pool)
        .await
        .expect("Failed to create the catalog tables");
    pool
}

/// A base time later than anything a previous run seeded, at Postgres precision.
fn base_time() -> DateTime<Utc> {
    (Utc::now() + Duration::days(365 * 100)).trunc_subsecs(6)
}

async fn insert_film_work(pool: &PgPool, title: &str, modified: DateTime<Utc>) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO content.film_work (id, title, rating, type, created, modified) \
         VALUES ($1, $2, 7.5, 'movie', $3, $3)",
    )
    .bind(id)
    .bind(title)
    .bind(modified)
    .execute(pool)
    .await
    .expect("Failed to insert film work");
    id
}

async fn insert_person(
    pool: &PgPool,
    film_work_id: Uuid,
    full_name: &str,
    role: &str,
    at: DateTime<Utc>,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO content.person (id, full_name, created, modified) VALUES ($1, $2, $3, $3)",
    )
    .bind(id)
    .bind(full_name)
    .bind(at)
    .execute(pool)
    .await
    .expect("Failed to insert person");
    sqlx::query(
        "INSERT INTO content.person_film_work (id, film_work_id, person_id, role, created) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(film_work_id)
    .bind(id)
    .bind(role)
    .bind(at)
    .execute(pool)
    .await
    .expect("Failed to link person");
    id
}

async fn touch(pool: &PgPool, table: &str, id: Uuid, modified: DateTime<Utc>) {
    sqlx::query(&format!("UPDATE content.{table} SET modified = $1 WHERE id = $2"))
        .bind(modified)
        .bind(id)
        .execute(pool)
        .await
        .expect("Failed to update modified");
}

async fn remove(pool: &PgPool, film_work_ids: &[Uuid], person_ids: &[Uuid]) {
    sqlx::query("DELETE FROM content.film_work WHERE id = ANY($1)")
        .bind(film_work_ids)
        .execute(pool)
        .await
        .expect("Failed to delete film works");
    sqlx::query("DELETE FROM content.person WHERE id = ANY($1)")
        .bind(person_ids)
        .execute(pool)
        .await
        .expect("Failed to delete persons");
}

async fn extract_all(
    extractor: &PostgresExtractor,
    watermark: DateTime<Utc>,
    exclusion: Exclusion,
) -> Vec<Vec<RawFilmWork>> {
    extractor
        .extract(watermark, exclusion)
        .try_collect()
        .await
        .expect("Extraction failed")
}

fn find(batches: &[Vec<RawFilmWork>], id: Uuid) -> Option<&RawFilmWork> {
    batches.iter().flatten().find(|row| row.id == Some(id))
}

#[ignore]
#[tokio::test(flavor = "multi_thread")]
async fn test_person_change_marks_film_work_changed() {
    let pool = catalog().await;
    let extractor = PostgresExtractor::new(pool.clone(), 100);
    let base = base_time();

    let film_work = insert_film_work(&pool, "Stalker", base).await;
    let person = insert_person(&pool, film_work, "Andrei Tarkovsky", "director", base).await;
    let watermark = base + Duration::hours(1);

    let batches = extract_all(&extractor, watermark, Exclusion::default()).await;
    assert!(find(&batches, film_work).is_none());

    let renamed_at = base + Duration::hours(2);
    touch(&pool, "person", person, renamed_at).await;

    let batches = extract_all(&extractor, watermark, Exclusion::default()).await;
    let row = find(&batches, film_work).expect("film work should be extracted");
    assert_eq!(row.title.as_deref(), Some("Stalker"));
    assert_eq!(row.modified, Some(base));
    assert_eq!(row.last_modified, Some(renamed_at));
    let persons = row.persons.as_ref().expect("persons should be aggregated");
    assert_eq!(persons.len(), 1);
    assert_eq!(persons[0].person_id, Some(person));
    assert_eq!(persons[0].person_name.as_deref(), Some("Andrei Tarkovsky"));

    remove(&pool, &[film_work], &[person]).await;
}

#[ignore]
#[tokio::test(flavor = "multi_thread")]
async fn test_pending_id_is_skipped_until_changed_again() {
    let pool = catalog().await;
    let extractor = PostgresExtractor::new(pool.clone(), 100);
    let base = base_time();
    let watermark = base - Duration::seconds(1);

    let pending = insert_film_work(&pool, "Mirror", base).await;
    let other = insert_film_work(&pool, "Nostalghia", base).await;
    let pending_since = base + Duration::hours(1);
    let exclusion = Exclusion::new(BTreeSet::from([pending]), Some(pending_since));

    let batches = extract_all(&extractor, watermark, exclusion.clone()).await;
    assert!(find(&batches, pending).is_none());
    assert!(find(&batches, other).is_some());

    // No start time for the pending list: nothing is skipped.
    let batches = extract_all(
        &extractor,
        watermark,
        Exclusion::new(BTreeSet::from([pending]), None),
    )
    .await;
    assert!(find(&batches, pending).is_some());

    touch(&pool, "film_work", pending, base + Duration::hours(2)).await;

    let batches = extract_all(&extractor, watermark, exclusion).await;
    assert!(find(&batches, pending).is_some());

    remove(&pool, &[pending, other], &[]).await;
}

#[ignore]
#[tokio::test(flavor = "multi_thread")]
async fn test_pages_continue_after_last_row() {
    let pool = catalog().await;
    let extractor = PostgresExtractor::new(pool.clone(), 1);
    let base = base_time();

    let first = insert_film_work(&pool, "Ivan's Childhood", base).await;
    let tied = insert_film_work(&pool, "Andrei Rublev", base).await;
    let last = insert_film_work(&pool, "Solaris", base + Duration::seconds(1)).await;

    let batches = extract_all(&extractor, base - Duration::seconds(1), Exclusion::default()).await;

    assert!(batches.iter().all(|batch| batch.len() == 1));
    let seeded = [first, tied, last];
    let order: Vec<Uuid> = batches
        .iter()
        .flatten()
        .filter_map(|row| row.id)
        .filter(|id| seeded.contains(id))
        .collect();
    let (low, high) = if first < tied { (first, tied) } else { (tied, first) };
    assert_eq!(order, vec![low, high, last]);

    remove(&pool, &seeded, &[]).await;
}

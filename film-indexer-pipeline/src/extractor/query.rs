//! SQL for change detection.

/// One page of changed film works.
///
/// Parameters:
/// - `$1` watermark: rows whose last modification is after it
/// - `$2` excluded ids (`uuid[]`, may be empty)
/// - `$3` excluded ids are kept when modified after this time; when NULL no
///   id is excluded
/// - `$4`, `$5` keyset cursor: `(last_modified, id)` of the previous page's last row
/// - `$6` page size
///
/// `last_modified` is the greatest of the work's own `modified`, its persons'
/// and genres' `modified`, and the `created` time of its associations.
pub(crate) const CHANGED_FILM_WORKS_PAGE: &str = r#"
WITH film_works AS (
    SELECT
        fw.id,
        fw.title,
        fw.description,
        fw.rating,
        fw.type AS kind,
        fw.created,
        fw.modified,
        GREATEST(
            fw.modified,
            MAX(p.modified),
            MAX(g.modified),
            MAX(pfw.created),
            MAX(gfw.created)
        ) AS last_modified,
        COALESCE(
            json_agg(
                DISTINCT jsonb_build_object(
                    'person_role', pfw.role,
                    'person_id', p.id,
                    'person_name', p.full_name
                )
            ) FILTER (WHERE p.id IS NOT NULL),
            '[]'
        ) AS persons,
        COALESCE(
            array_agg(DISTINCT g.name::text) FILTER (WHERE g.id IS NOT NULL),
            '{}'
        ) AS genres
    FROM content.film_work fw
    LEFT JOIN content.person_film_work pfw ON pfw.film_work_id = fw.id
    LEFT JOIN content.person p ON p.id = pfw.person_id
    LEFT JOIN content.genre_film_work gfw ON gfw.film_work_id = fw.id
    LEFT JOIN content.genre g ON g.id = gfw.genre_id
    GROUP BY fw.id
)
SELECT *
FROM film_works
WHERE last_modified > $1::timestamptz
  AND (id <> ALL($2::uuid[]) OR $3::timestamptz IS NULL OR last_modified > $3::timestamptz)
  AND (last_modified, id) > ($4::timestamptz, $5::uuid)
ORDER BY last_modified, id
LIMIT $6
"#;

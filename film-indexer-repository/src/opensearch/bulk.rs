//! Bulk request construction and response parsing.

use serde_json::{json, Value};

use crate::errors::SearchError;
use crate::types::{BulkItemResult, BulkUpsertSummary};
use film_indexer_shared::SearchDocument;

/// Build the newline-delimited bulk body: an `index` action followed by the
/// document source, for each document.
///
/// The `index` action replaces any existing document with the same `_id`,
/// which makes repeated delivery of a document idempotent.
pub(crate) fn build_bulk_body(
    index_name: &str,
    documents: &[SearchDocument],
) -> Result<Vec<Value>, SearchError> {
    let mut body = Vec::with_capacity(documents.len() * 2);

    for doc in documents {
        body.push(json!({
            "index": {
                "_index": index_name,
                "_id": doc.document_id()
            }
        }));
        body.push(
            serde_json::to_value(doc)
                .map_err(|e| SearchError::serialization(format!("{}: {}", doc.id, e)))?,
        );
    }

    Ok(body)
}

/// Turn a bulk response body into per-document results.
///
/// Items are matched to documents by `_id`; the engine returns them in
/// request order.
pub(crate) fn parse_bulk_response(
    response_body: &Value,
    documents: &[SearchDocument],
) -> Result<BulkUpsertSummary, SearchError> {
    let items = response_body
        .get("items")
        .and_then(|i| i.as_array())
        .ok_or_else(|| SearchError::parse("bulk response has no items array"))?;

    if items.len() != documents.len() {
        return Err(SearchError::parse(format!(
            "bulk response has {} items for {} documents",
            items.len(),
            documents.len()
        )));
    }

    let results = items
        .iter()
        .zip(documents)
        .map(|(item, doc)| {
            let action = item
                .get("index")
                .or_else(|| item.get("create"))
                .or_else(|| item.get("update"));

            let document_id = action
                .and_then(|a| a.get("_id"))
                .and_then(|id| id.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| doc.document_id());

            let error = action.and_then(|a| a.get("error")).map(describe_item_error);

            BulkItemResult {
                document_id,
                success: error.is_none() && action.is_some(),
                error: error.or_else(|| {
                    action
                        .is_none()
                        .then(|| "missing action in bulk item".to_string())
                }),
            }
        })
        .collect();

    Ok(BulkUpsertSummary::from_results(results))
}

fn describe_item_error(error: &Value) -> String {
    let kind = error.get("type").and_then(|t| t.as_str());
    let reason = error.get("reason").and_then(|r| r.as_str());

    match (kind, reason) {
        (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
        (Some(kind), None) => kind.to_string(),
        _ => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn doc(id: &str, title: &str) -> SearchDocument {
        SearchDocument::new(Uuid::parse_str(id).unwrap(), title)
    }

    #[test]
    fn test_build_bulk_body_pairs_actions_and_sources() {
        let docs = vec![
            doc("550e8400-e29b-41d4-a716-446655440000", "First"),
            doc("6ba7b810-9dad-11d1-80b4-00c04fd430c8", "Second"),
        ];

        let body = build_bulk_body("movies", &docs).unwrap();

        assert_eq!(body.len(), 4);
        assert_eq!(body[0]["index"]["_index"], "movies");
        assert_eq!(body[0]["index"]["_id"], "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(body[1]["title"], "First");
        assert_eq!(body[2]["index"]["_id"], "6ba7b810-9dad-11d1-80b4-00c04fd430c8");
        assert_eq!(body[3]["title"], "Second");
    }

    #[test]
    fn test_parse_bulk_response_all_succeeded() {
        let docs = vec![doc("550e8400-e29b-41d4-a716-446655440000", "First")];
        let response = json!({
            "took": 3,
            "errors": false,
            "items": [
                { "index": { "_id": "550e8400-e29b-41d4-a716-446655440000", "status": 201 } }
            ]
        });

        let summary = parse_bulk_response(&response, &docs).unwrap();

        assert_eq!(summary.total, 1);
        assert!(summary.is_complete());
    }

    #[test]
    fn test_parse_bulk_response_with_item_error() {
        let docs = vec![
            doc("550e8400-e29b-41d4-a716-446655440000", "First"),
            doc("6ba7b810-9dad-11d1-80b4-00c04fd430c8", "Second"),
        ];
        let response = json!({
            "errors": true,
            "items": [
                { "index": { "_id": "550e8400-e29b-41d4-a716-446655440000", "status": 200 } },
                { "index": {
                    "_id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8",
                    "status": 400,
                    "error": { "type": "mapper_parsing_exception", "reason": "failed to parse field [imdb_rating]" }
                } }
            ]
        });

        let summary = parse_bulk_response(&response, &docs).unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.first_error(),
            Some("mapper_parsing_exception: failed to parse field [imdb_rating]")
        );
        assert_eq!(summary.results[1].document_id, "6ba7b810-9dad-11d1-80b4-00c04fd430c8");
    }

    #[test]
    fn test_parse_bulk_response_item_count_mismatch() {
        let docs = vec![doc("550e8400-e29b-41d4-a716-446655440000", "First")];
        let response = json!({ "errors": false, "items": [] });

        assert!(matches!(
            parse_bulk_response(&response, &docs),
            Err(SearchError::ParseError(_))
        ));
    }
}

//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust client.

use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, OpenSearch,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::errors::SearchError;
use crate::interfaces::SearchEngineClient;
use crate::opensearch::bulk::{build_bulk_body, parse_bulk_response};
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::types::{BulkUpsertSummary, IndexStatus};
use film_indexer_shared::SearchDocument;

/// Request timeout applied to every call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// use film_indexer_repository::{IndexConfig, OpenSearchClient, SearchEngineClient};
///
/// let client = OpenSearchClient::new("http://localhost:9200", IndexConfig::new("movies"))?;
/// client.ensure_index_exists().await?;
/// let summary = client.bulk_upsert(&documents).await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client for the specified URL.
    ///
    /// No request is sent; connectivity is checked by `health_check`.
    ///
    /// # Arguments
    ///
    /// * `url` - The server URL (e.g., "http://localhost:9200")
    /// * `index_config` - The target index
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchError)` - If the URL is invalid or transport setup fails
    pub fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchError> {
        let parsed_url = Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            index = %index_config.name,
            "Created OpenSearch client"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    /// Name of the target index.
    pub fn index_name(&self) -> &str {
        &self.index_config.name
    }

    async fn index_exists(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[self.index_name()]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(SearchError::unavailable(format!(
                "index exists check returned status {}",
                status
            ))),
        }
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        Ok(response.status_code().is_success())
    }

    /// Create the index with the film schema unless it already exists.
    ///
    /// A `resource_already_exists_exception` from a concurrent creation is
    /// treated as the index already existing.
    #[instrument(skip(self), fields(index = %self.index_config.name))]
    async fn ensure_index_exists(&self) -> Result<IndexStatus, SearchError> {
        if self.index_exists().await? {
            debug!("Index already exists");
            return Ok(IndexStatus::AlreadyExists);
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(self.index_name()))
            .body(get_index_settings())
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            info!("Index created");
            return Ok(IndexStatus::Created);
        }

        let error_body = response.text().await.unwrap_or_default();
        if error_body.contains("resource_already_exists_exception") {
            warn!("Index was created concurrently");
            return Ok(IndexStatus::AlreadyExists);
        }

        error!(status = %status, body = %error_body, "Index creation failed");
        Err(SearchError::index_creation(format!(
            "Index creation failed with status {}: {}",
            status, error_body
        )))
    }

    /// Write all documents with one bulk request.
    ///
    /// A transport failure or non-success status fails the whole call;
    /// otherwise per-document failures are reported in the summary.
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn bulk_upsert(
        &self,
        documents: &[SearchDocument],
    ) -> Result<BulkUpsertSummary, SearchError> {
        if documents.is_empty() {
            return Ok(BulkUpsertSummary::default());
        }

        let body: Vec<JsonBody<Value>> = build_bulk_body(self.index_name(), documents)?
            .into_iter()
            .map(JsonBody::new)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::Index(self.index_name()))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchError::bulk_index(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        let summary = parse_bulk_response(&response_body, documents)?;
        debug!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk request completed"
        );

        Ok(summary)
    }
}

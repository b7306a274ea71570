//! Dependency initialization and wiring for the film indexer.

use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::IndexingError;
use film_indexer_pipeline::{
    backoff::TokioSleeper,
    extractor::PostgresExtractor,
    loader::SearchLoader,
    scheduler::Scheduler,
    state::{JsonFileStorage, StateStore},
    supervisor::RetrySupervisor,
    transformer::FilmWorkTransformer,
};
use film_indexer_repository::{IndexConfig, OpenSearchClient};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured scheduler ready to run.
    pub scheduler: Scheduler,
}

impl Dependencies {
    /// Wire every component from `settings`.
    ///
    /// Nothing connects here: the database pool is lazy and the search index
    /// is first contacted by [`Scheduler::run`], under backoff.
    pub fn new(settings: &Settings) -> Result<Self, IndexingError> {
        info!(
            postgres_host = %settings.postgres.host,
            postgres_db = %settings.postgres.database,
            search_url = %settings.search.url,
            index = %settings.search.index_name,
            batch_size = settings.sync.batch_size,
            state_file = %settings.state_file.display(),
            "Initializing dependencies"
        );

        let extractor = PostgresExtractor::connect_lazy(
            settings.postgres.connect_options(),
            settings.sync.batch_size,
        );

        let search_client = OpenSearchClient::new(
            settings.search.url.as_str(),
            IndexConfig::new(settings.search.index_name.clone()),
        )?;
        let loader = SearchLoader::new(Arc::new(search_client));

        let state = StateStore::new(Box::new(JsonFileStorage::new(&settings.state_file)));

        let supervisor = RetrySupervisor::new(
            Arc::new(extractor),
            FilmWorkTransformer::new(),
            loader,
            state,
        );

        let scheduler = Scheduler::new(
            supervisor,
            settings.sync.scheduler_config(),
            Arc::new(TokioSleeper),
        );

        Ok(Self { scheduler })
    }
}

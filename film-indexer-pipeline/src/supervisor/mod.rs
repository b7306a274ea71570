//! Retry supervisor for the film indexer pipeline.
//!
//! Runs one full extract, transform and load pass and commits its progress
//! to the state store. Failures are absorbed into a [`RunOutcome`] so the
//! caller keeps scheduling runs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::extractor::{ChangeExtractor, Exclusion};
use crate::loader::SearchLoader;
use crate::state::StateStore;
use crate::transformer::FilmWorkTransformer;
use film_indexer_repository::IndexStatus;
use film_indexer_shared::RawFilmWork;

/// Counters for one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Batches fully loaded.
    pub batches: usize,
    pub documents_loaded: usize,
    /// Malformed rows left out of their batch.
    pub rows_skipped: usize,
    /// Stored watermark when the pass ended.
    pub watermark: DateTime<Utc>,
}

impl RunReport {
    fn starting_at(watermark: DateTime<Utc>) -> Self {
        Self {
            batches: 0,
            documents_loaded: 0,
            rows_skipped: 0,
            watermark,
        }
    }
}

/// How a pass ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every batch was loaded and the watermark advanced.
    Completed(RunReport),
    /// The pass stopped early. The watermark was not advanced; ids loaded
    /// before the failure are kept as pending.
    Failed {
        error: PipelineError,
        report: RunReport,
    },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn report(&self) -> &RunReport {
        match self {
            Self::Completed(report) | Self::Failed { report, .. } => report,
        }
    }
}

/// Drives the pipeline components through one pass at a time.
pub struct RetrySupervisor {
    extractor: Arc<dyn ChangeExtractor>,
    transformer: FilmWorkTransformer,
    loader: SearchLoader,
    state: StateStore,
}

impl RetrySupervisor {
    pub fn new(
        extractor: Arc<dyn ChangeExtractor>,
        transformer: FilmWorkTransformer,
        loader: SearchLoader,
        state: StateStore,
    ) -> Self {
        Self {
            extractor,
            transformer,
            loader,
            state,
        }
    }

    /// Create the search index if it is missing.
    pub async fn ensure_index(&self) -> Result<IndexStatus, PipelineError> {
        self.loader.ensure_index().await
    }

    /// Execute one pass. Never returns an error; failures are logged and
    /// reported through [`RunOutcome::Failed`].
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> RunOutcome {
        let started_at = Utc::now();
        let mut report = RunReport::starting_at(DateTime::<Utc>::UNIX_EPOCH);

        match self.execute(started_at, &mut report).await {
            Ok(()) => {
                info!(
                    batches = report.batches,
                    documents = report.documents_loaded,
                    skipped = report.rows_skipped,
                    watermark = %report.watermark,
                    "Sync run completed"
                );
                RunOutcome::Completed(report)
            }
            Err(error) => {
                error!(
                    error = %error,
                    batches = report.batches,
                    documents = report.documents_loaded,
                    watermark = %report.watermark,
                    "Sync run failed, watermark not advanced"
                );
                RunOutcome::Failed { error, report }
            }
        }
    }

    async fn execute(
        &self,
        started_at: DateTime<Utc>,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        let state = self.state.get_state().await?;
        let watermark = state.last_successful_watermark;
        report.watermark = watermark;

        let exclusion = Exclusion::new(state.pending_loaded_ids, state.pending_since);
        info!(
            watermark = %watermark,
            excluded = exclusion.ids.len(),
            "Starting sync run"
        );

        let mut batches = self.extractor.extract(watermark, exclusion);
        let mut batch_index = 0usize;

        while let Some(next) = batches.next().await {
            let rows = next.inspect_err(|e| {
                error!(batch_index = batch_index, error = %e, "Failed to extract batch");
            })?;
            self.process_batch(batch_index, rows, started_at, report)
                .await?;
            batch_index += 1;
        }

        self.state.set_watermark(started_at).await?;
        self.state.clear_pending_loaded_ids().await?;
        report.watermark = self.state.get_watermark().await?;

        Ok(())
    }

    async fn process_batch(
        &self,
        batch_index: usize,
        rows: Vec<RawFilmWork>,
        started_at: DateTime<Utc>,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        let transformed = self.transformer.transform_batch(rows);
        for rejected in &transformed.rejected {
            warn!(batch_index = batch_index, error = %rejected, "Skipping malformed row");
        }
        report.rows_skipped += transformed.rejected.len();

        let first_id = transformed.documents.first().map(|doc| doc.id);
        let last_id = transformed.documents.last().map(|doc| doc.id);

        let loaded: Vec<Uuid> = self
            .loader
            .load(&transformed.documents)
            .await
            .inspect_err(|e| {
                error!(
                    batch_index = batch_index,
                    first_id = ?first_id,
                    last_id = ?last_id,
                    error = %e,
                    "Failed to load batch"
                );
            })?;

        let count = loaded.len();
        self.state
            .append_pending_loaded_ids(loaded, started_at)
            .await?;

        report.batches += 1;
        report.documents_loaded += count;
        info!(
            batch_index = batch_index,
            count = count,
            first_id = ?first_id,
            last_id = ?last_id,
            "Loaded batch"
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use futures::stream::{self, StreamExt};

    use crate::errors::PipelineError;
    use crate::extractor::{BatchStream, ChangeExtractor, Exclusion};
    use film_indexer_repository::{
        BulkUpsertSummary, IndexStatus, MemorySearchIndex, SearchEngineClient, SearchError,
    };
    use film_indexer_shared::{RawFilmWork, SearchDocument};

    /// Serves fixed batches, applying the watermark and exclusion the way
    /// the database query does, and records every call.
    #[derive(Default)]
    pub struct MockExtractor {
        pub batches: Vec<Vec<RawFilmWork>>,
        pub calls: Mutex<Vec<(DateTime<Utc>, Exclusion)>>,
    }

    impl MockExtractor {
        pub fn new(batches: Vec<Vec<RawFilmWork>>) -> Self {
            Self {
                batches,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<(DateTime<Utc>, Exclusion)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ChangeExtractor for MockExtractor {
        fn extract(&self, watermark: DateTime<Utc>, exclusion: Exclusion) -> BatchStream<'_> {
            self.calls
                .lock()
                .unwrap()
                .push((watermark, exclusion.clone()));

            let batches: Vec<Result<Vec<RawFilmWork>, PipelineError>> = self
                .batches
                .iter()
                .map(|batch| {
                    batch
                        .iter()
                        .filter(|row| {
                            let Some(last_modified) = row.last_modified else {
                                return true;
                            };
                            let excluded = row
                                .id
                                .is_some_and(|id| exclusion.excludes(&id, last_modified));
                            last_modified > watermark && !excluded
                        })
                        .cloned()
                        .collect::<Vec<_>>()
                })
                .filter(|batch| !batch.is_empty())
                .map(Ok)
                .collect();

            stream::iter(batches).boxed()
        }
    }

    /// In-memory index whose bulk call number `fail_on_call` (1-based) fails.
    #[derive(Default)]
    pub struct FlakyIndex {
        pub index: MemorySearchIndex,
        pub fail_on_call: AtomicUsize,
        pub bulk_calls: AtomicUsize,
    }

    impl FlakyIndex {
        pub fn failing_on(call: usize) -> Self {
            Self {
                fail_on_call: AtomicUsize::new(call),
                ..Default::default()
            }
        }

        pub fn heal(&self) {
            self.fail_on_call.store(0, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SearchEngineClient for FlakyIndex {
        async fn health_check(&self) -> Result<bool, SearchError> {
            self.index.health_check().await
        }

        async fn ensure_index_exists(&self) -> Result<IndexStatus, SearchError> {
            self.index.ensure_index_exists().await
        }

        async fn bulk_upsert(
            &self,
            docs: &[SearchDocument],
        ) -> Result<BulkUpsertSummary, SearchError> {
            let call = self.bulk_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on_call.load(Ordering::SeqCst) {
                return Err(SearchError::connection("connection reset by peer"));
            }
            self.index.bulk_upsert(docs).await
        }
    }
}

use std::sync::Arc;
use std::time::SystemTime;

use analysis::{aggregate_batch, AggregateStats};
use common::AppConfig;
use normalizer::{normalize_batch, NormalizedBatch};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::cache::ResultCache;
use crate::client::{FilterState, HttpPetitionsClient, PetitionsClient};
use crate::error::FetchError;
use crate::metrics;
use crate::pager::Pager;

/// Runs fetch, normalize and aggregate on demand and caches the normalized
/// batch per filter state.
pub struct PetitionService {
    client: Arc<dyn PetitionsClient>,
    pager: Pager,
    // held across a whole refresh, so only one upstream fetch runs at a time
    cache: Mutex<ResultCache<Arc<NormalizedBatch>>>,
}

impl PetitionService {
    pub fn new(client: Arc<dyn PetitionsClient>, config: &AppConfig) -> Self {
        Self {
            client,
            pager: Pager::new(config.petitions.max_pages, config.retry.clone()),
            cache: Mutex::new(ResultCache::new(config.cache.capacity, config.cache.ttl())),
        }
    }

    pub fn from_config(config: &AppConfig) -> common::Result<Self> {
        let client = HttpPetitionsClient::from_config(&config.petitions)?;
        Ok(Self::new(Arc::new(client), config))
    }

    /// One entry per raw upstream record, malformed ones included.
    #[instrument(skip(self, filter), fields(filter = %filter))]
    pub async fn get_normalized_petitions(
        &self,
        filter: FilterState,
    ) -> Result<Arc<NormalizedBatch>, FetchError> {
        let mut cache = self.cache.lock().await;
        if let Some(batch) = cache.get_at(filter, SystemTime::now()) {
            metrics::CACHE_LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
            debug!(records = batch.len(), "serving cached petitions");
            return Ok(batch);
        }
        metrics::CACHE_LOOKUPS_TOTAL.with_label_values(&["miss"]).inc();

        let raws = self.pager.fetch_all(self.client.as_ref(), filter).await?;
        let batch = Arc::new(normalize_batch(&raws));
        metrics::RECORDS_NORMALIZED_TOTAL
            .with_label_values(&["valid"])
            .inc_by(batch.valid_count() as u64);
        metrics::RECORDS_NORMALIZED_TOTAL
            .with_label_values(&["malformed"])
            .inc_by(batch.skipped_count() as u64);
        info!(
            valid = batch.valid_count(),
            skipped = batch.skipped_count(),
            "normalized petitions"
        );
        cache.put_at(filter, Arc::clone(&batch), SystemTime::now());
        Ok(batch)
    }

    pub async fn get_aggregate_stats(
        &self,
        filter: FilterState,
    ) -> Result<AggregateStats, FetchError> {
        let batch = self.get_normalized_petitions(filter).await?;
        Ok(aggregate_batch(&batch))
    }

    /// Drops every cached result so the next request goes upstream.
    pub async fn refresh(&self) -> usize {
        let mut cache = self.cache.lock().await;
        let dropped = cache.len();
        cache.clear();
        info!(dropped, "petition cache invalidated");
        dropped
    }
}

use std::time::{Duration, Instant};

use broker::exponential_jitter_backoff;
use common::config::RetryConfig;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::client::{FilterState, PageCursor, PetitionPage, PetitionsClient};
use crate::error::FetchError;
use crate::metrics;

/// Follows `links.next` until the upstream runs out of pages, retrying
/// rate-limited pages and refusing to go past `max_pages`.
#[derive(Debug, Clone)]
pub struct Pager {
    max_pages: u32,
    retry: RetryConfig,
}

impl Pager {
    pub fn new(max_pages: u32, retry: RetryConfig) -> Self {
        Self { max_pages, retry }
    }

    #[instrument(skip(self, client, filter), fields(filter = %filter, max_pages = self.max_pages))]
    pub async fn fetch_all(
        &self,
        client: &dyn PetitionsClient,
        filter: FilterState,
    ) -> Result<Vec<Value>, FetchError> {
        let started = Instant::now();
        let result = self.collect_pages(client, filter).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => err.kind(),
        };
        metrics::FETCHES_TOTAL.with_label_values(&[outcome]).inc();
        metrics::FETCH_DURATION.observe(started.elapsed().as_secs_f64());
        result
    }

    async fn collect_pages(
        &self,
        client: &dyn PetitionsClient,
        filter: FilterState,
    ) -> Result<Vec<Value>, FetchError> {
        let mut records = Vec::new();
        let mut cursor: Option<PageCursor> = None;
        let mut pages = 0u32;
        loop {
            if pages >= self.max_pages {
                warn!(pages, "petitions listing did not end within the page limit");
                return Err(FetchError::PaginationLimitExceeded {
                    max_pages: self.max_pages,
                });
            }
            let page = self.fetch_page(client, filter, cursor.as_ref()).await?;
            pages += 1;
            metrics::PAGES_FETCHED_TOTAL.inc();
            records.extend(page.records);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        info!(pages, records = records.len(), "fetched petitions listing");
        Ok(records)
    }

    async fn fetch_page(
        &self,
        client: &dyn PetitionsClient,
        filter: FilterState,
        cursor: Option<&PageCursor>,
    ) -> Result<PetitionPage, FetchError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match client.fetch_petitions(filter, cursor).await {
                Err(FetchError::RateLimited { retry_after }) if attempt < max_attempts => {
                    let wait = self.wait_before_retry(attempt, retry_after);
                    warn!(
                        attempt,
                        max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        "petitions API rate limited the request, retrying"
                    );
                    metrics::RATE_LIMIT_RETRIES_TOTAL.inc();
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Honors `Retry-After` when present, else backs off exponentially. Either
    /// way the wait never exceeds `backoff_max_ms`.
    fn wait_before_retry(&self, attempt: u32, advised: Option<Duration>) -> Duration {
        let max = Duration::from_millis(self.retry.backoff_max_ms);
        match advised {
            Some(wait) => wait.min(max),
            None => exponential_jitter_backoff(
                Duration::from_millis(self.retry.backoff_base_ms),
                attempt - 1,
                max,
                self.retry.jitter_frac,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advised_wait_is_capped() {
        let pager = Pager::new(
            10,
            RetryConfig {
                backoff_max_ms: 2_000,
                ..RetryConfig::default()
            },
        );
        assert_eq!(
            pager.wait_before_retry(1, Some(Duration::from_secs(3600))),
            Duration::from_secs(2)
        );
        assert_eq!(
            pager.wait_before_retry(1, Some(Duration::from_millis(250))),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn backoff_used_without_advice() {
        let pager = Pager::new(
            10,
            RetryConfig {
                backoff_base_ms: 100,
                jitter_frac: 0.0,
                ..RetryConfig::default()
            },
        );
        assert_eq!(pager.wait_before_retry(1, None), Duration::from_millis(100));
        assert_eq!(pager.wait_before_retry(3, None), Duration::from_millis(400));
    }
}

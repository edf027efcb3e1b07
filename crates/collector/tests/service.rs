use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use collector::{FetchError, FilterState, PageCursor, PetitionPage, PetitionService, PetitionsClient};
use common::AppConfig;
use fixtures::{open_petitions, PetitionBuilder};
use normalizer::MalformedRecordError;
use serde_json::Value;

/// Serves the same single page every call and counts how often it is asked.
struct StubClient {
    records: Vec<Value>,
    calls: AtomicUsize,
    delay: Duration,
}

impl StubClient {
    fn new(records: Vec<Value>) -> Self {
        Self {
            records,
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PetitionsClient for StubClient {
    async fn fetch_petitions(
        &self,
        _filter: FilterState,
        _cursor: Option<&PageCursor>,
    ) -> Result<PetitionPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(PetitionPage {
            records: self.records.clone(),
            next_cursor: None,
        })
    }
}

struct FailingClient;

#[async_trait]
impl PetitionsClient for FailingClient {
    async fn fetch_petitions(
        &self,
        _filter: FilterState,
        _cursor: Option<&PageCursor>,
    ) -> Result<PetitionPage, FetchError> {
        Err(FetchError::Network {
            url: "https://petition.parliament.uk/petitions.json".into(),
            source: anyhow::anyhow!("connection refused"),
        })
    }
}

fn mixed_records() -> Vec<Value> {
    let mut records = open_petitions(1, 8);
    records.insert(2, PetitionBuilder::new(0, "open").without_id().build());
    records.push(
        PetitionBuilder::new(99, "open")
            .without_attr("signature_count")
            .build(),
    );
    records
}

#[tokio::test]
async fn malformed_records_are_reported_and_skipped() {
    let client = Arc::new(StubClient::new(mixed_records()));
    let service = PetitionService::new(client.clone(), &AppConfig::default());

    let batch = service
        .get_normalized_petitions(FilterState::Open)
        .await
        .unwrap();
    assert_eq!(batch.len(), 10);
    assert_eq!(batch.skipped_count(), 2);
    let errors: Vec<(usize, &MalformedRecordError)> = batch.errors().collect();
    assert_eq!(errors[0].0, 2);
    assert_eq!(errors[1].1.id(), Some(99));

    let stats = service.get_aggregate_stats(FilterState::Open).await.unwrap();
    assert_eq!(stats.total, 8);
    assert_eq!(stats.skipped_count, 2);
}

#[tokio::test]
async fn repeated_requests_hit_the_cache_until_refresh() {
    let client = Arc::new(StubClient::new(open_petitions(1, 3)));
    let service = PetitionService::new(client.clone(), &AppConfig::default());

    service.get_aggregate_stats(FilterState::Open).await.unwrap();
    service.get_aggregate_stats(FilterState::Open).await.unwrap();
    assert_eq!(client.calls(), 1);

    service.get_aggregate_stats(FilterState::Closed).await.unwrap();
    assert_eq!(client.calls(), 2);

    assert_eq!(service.refresh().await, 2);
    service.get_aggregate_stats(FilterState::Open).await.unwrap();
    assert_eq!(client.calls(), 3);
}

#[tokio::test]
async fn concurrent_callers_share_one_fetch() {
    let client = Arc::new(StubClient {
        delay: Duration::from_millis(20),
        ..StubClient::new(open_petitions(1, 4))
    });
    let service = Arc::new(PetitionService::new(client.clone(), &AppConfig::default()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.get_aggregate_stats(FilterState::All).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().total, 4);
    }
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn fetch_failure_is_not_cached() {
    let service = PetitionService::new(Arc::new(FailingClient), &AppConfig::default());

    let err = service
        .get_aggregate_stats(FilterState::All)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "could not load petitions, try again");
    assert!(service
        .get_normalized_petitions(FilterState::All)
        .await
        .is_err());
}

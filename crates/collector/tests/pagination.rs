use std::sync::Arc;
use std::time::Duration;

use collector::{FetchError, FilterState, HttpPetitionsClient, Pager, PetitionsClient};
use common::config::RetryConfig;
use fixtures::{open_petitions, page_body, page_url, Scripted, ScriptedExec, BASE_URL};
use http::StatusCode;

fn client(exec: &Arc<ScriptedExec>) -> HttpPetitionsClient {
    HttpPetitionsClient::new(exec.clone(), BASE_URL, "petitions-lab-tests").unwrap()
}

fn quick_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        backoff_base_ms: 1,
        backoff_max_ms: 5,
        jitter_frac: 0.0,
    }
}

#[tokio::test]
async fn follows_next_links_until_terminal_page() {
    let exec = Arc::new(ScriptedExec::paged(
        "open",
        vec![
            open_petitions(1, 50),
            open_petitions(51, 50),
            open_petitions(101, 10),
        ],
    ));
    let client = client(&exec);

    let records = Pager::new(3, quick_retry(3))
        .fetch_all(&client, FilterState::Open)
        .await
        .unwrap();

    assert_eq!(records.len(), 110);
    assert_eq!(records[0]["id"], 1);
    assert_eq!(records[109]["id"], 110);
    assert_eq!(
        exec.requests(),
        vec![page_url("open", 1), page_url("open", 2), page_url("open", 3)]
    );
}

#[tokio::test]
async fn page_cap_stops_runaway_listing() {
    let exec = Arc::new(ScriptedExec::paged(
        "all",
        vec![open_petitions(1, 5), open_petitions(6, 5), open_petitions(11, 5)],
    ));
    let client = client(&exec);

    let err = Pager::new(2, quick_retry(3))
        .fetch_all(&client, FilterState::All)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::PaginationLimitExceeded { max_pages: 2 }));
    assert_eq!(exec.request_count(), 2);
}

#[tokio::test]
async fn zero_page_cap_never_contacts_upstream() {
    let exec = Arc::new(ScriptedExec::paged("all", vec![open_petitions(1, 5)]));
    let client = client(&exec);

    let err = Pager::new(0, quick_retry(3))
        .fetch_all(&client, FilterState::All)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::PaginationLimitExceeded { max_pages: 0 }));
    assert_eq!(exec.request_count(), 0);
}

#[tokio::test]
async fn rate_limited_page_is_retried() {
    let exec = Arc::new(ScriptedExec::new([
        Scripted::ok(page_body(&open_petitions(1, 3), Some(page_url("open", 2).as_str()))),
        Scripted::rate_limited("0"),
        Scripted::ok(page_body(&open_petitions(4, 2), None)),
    ]));
    let client = client(&exec);

    let records = Pager::new(10, quick_retry(3))
        .fetch_all(&client, FilterState::Open)
        .await
        .unwrap();

    assert_eq!(records.len(), 5);
    let requests = exec.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1], requests[2]);
}

#[tokio::test]
async fn rate_limit_surfaces_after_attempts_run_out() {
    let exec = Arc::new(ScriptedExec::new([
        Scripted::rate_limited("0"),
        Scripted::rate_limited("7"),
    ]));
    let client = client(&exec);

    let err = Pager::new(10, quick_retry(2))
        .fetch_all(&client, FilterState::Open)
        .await
        .unwrap_err();

    assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    assert!(err.user_message().contains("rate limiting"));
    assert_eq!(exec.request_count(), 2);
}

#[tokio::test]
async fn client_maps_upstream_failures() {
    let exec = Arc::new(ScriptedExec::new([
        Scripted::ok(b"<html>maintenance</html>".to_vec()),
        Scripted::ok(br#"{"data": {"id": 1}, "links": {}}"#.to_vec()),
        Scripted::status(StatusCode::SERVICE_UNAVAILABLE),
        Scripted::TransportError("connection reset".into()),
    ]));
    let client = client(&exec);

    let mut kinds = Vec::new();
    for _ in 0..4 {
        let err = client
            .fetch_petitions(FilterState::Closed, None)
            .await
            .unwrap_err();
        kinds.push(err.kind());
    }
    assert_eq!(
        kinds,
        vec!["upstream_format", "upstream_format", "unexpected_status", "network"]
    );
}

#[tokio::test]
async fn next_link_to_another_host_is_rejected() {
    let exec = Arc::new(ScriptedExec::new([Scripted::ok(page_body(
        &open_petitions(1, 2),
        Some("https://petitions.example.com/petitions.json?page=2"),
    ))]));
    let client = client(&exec);

    let err = Pager::new(10, quick_retry(1))
        .fetch_all(&client, FilterState::Open)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::UpstreamFormat { .. }));
    assert_eq!(exec.request_count(), 1);
}

#[tokio::test]
async fn empty_listing_is_not_an_error() {
    let exec = Arc::new(ScriptedExec::paged("rejected", vec![Vec::new()]));
    let client = client(&exec);

    let page = client
        .fetch_petitions(FilterState::Rejected, None)
        .await
        .unwrap();

    assert!(page.records.is_empty());
    assert!(page.next_cursor.is_none());
}

use std::sync::Arc;
use std::time::Duration;

use api::{build_router, ApiState};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use collector::{FetchError, FilterState, PageCursor, PetitionPage, PetitionService, PetitionsClient};
use common::AppConfig;
use fixtures::{open_petitions, PetitionBuilder};
use serde_json::{json, Value};
use tower::util::ServiceExt;

enum Upstream {
    Records(Vec<Value>),
    RateLimited,
    Down,
}

struct StubClient(Upstream);

#[async_trait]
impl PetitionsClient for StubClient {
    async fn fetch_petitions(
        &self,
        _filter: FilterState,
        _cursor: Option<&PageCursor>,
    ) -> Result<PetitionPage, FetchError> {
        match &self.0 {
            Upstream::Records(records) => Ok(PetitionPage {
                records: records.clone(),
                next_cursor: None,
            }),
            Upstream::RateLimited => Err(FetchError::RateLimited {
                retry_after: Some(Duration::from_secs(42)),
            }),
            Upstream::Down => Err(FetchError::UnexpectedStatus {
                status: http::StatusCode::INTERNAL_SERVER_ERROR,
                url: "https://petition.parliament.uk/petitions.json".into(),
            }),
        }
    }
}

fn sample_records() -> Vec<Value> {
    let mut records = open_petitions(1, 3);
    records.push(
        PetitionBuilder::new(4, "closed")
            .title("Fund public libraries")
            .signatures(500)
            .department("Department for Culture, Media and Sport")
            .attr("closed_at", json!("2025-07-01T00:00:00Z"))
            .build(),
    );
    records.push(PetitionBuilder::new(0, "open").without_id().build());
    records
}

fn app(upstream: Upstream) -> Router {
    let mut config = AppConfig::default();
    config.retry.max_attempts = 1;
    let service = PetitionService::new(Arc::new(StubClient(upstream)), &config);
    build_router(Arc::new(ApiState {
        service: Arc::new(service),
        metrics_path: config.observability.metrics_path.clone(),
    }))
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(request).await.unwrap();
    let status = res.status();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    call(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn healthz_is_ok() {
    let (status, body) = get(app(Upstream::Down), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn petitions_are_sorted_paged_and_report_malformed_records() {
    let (status, body) = get(app(Upstream::Records(sample_records())), "/petitions?per_page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_matching"], 4);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["skipped_count"], 1);
    let ids: Vec<i64> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![4, 3]);
    assert_eq!(body["items"][0]["url"], "https://petition.parliament.uk/petitions/4");
    assert_eq!(body["errors"][0]["position"], 4);
    assert_eq!(body["errors"][0]["error"]["kind"], "missing_field");
}

#[tokio::test]
async fn petitions_sort_by_requested_column() {
    let (status, body) = get(
        app(Upstream::Records(sample_records())),
        "/petitions?sort=closed_at&order=asc",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sort"], "closed_at");
    assert_eq!(body["order"], "ascending");
    let ids: Vec<i64> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![4, 1, 2, 3]);

    let (_, body) = get(
        app(Upstream::Records(sample_records())),
        "/petitions?sort=title&order=desc&per_page=1",
    )
    .await;
    assert_eq!(body["items"][0]["title"], "Petition number 3");

    let (status, _) = get(app(Upstream::Records(Vec::new())), "/petitions?sort=colour").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_respect_record_filters() {
    let (status, body) = get(
        app(Upstream::Records(sample_records())),
        "/stats?status=open&min_signatures=15",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["skipped_count"], 1);
    assert_eq!(body["by_state"]["open"], 2);
    assert_eq!(body["by_state"]["closed"], 0);
    assert_eq!(body["signatures"]["min"], 20.0);
}

#[tokio::test]
async fn department_filter_and_search() {
    let (_, body) = get(
        app(Upstream::Records(sample_records())),
        "/petitions?department=Unassigned&q=NUMBER%202",
    )
    .await;
    assert_eq!(body["total_matching"], 1);
    assert_eq!(body["items"][0]["id"], 2);
}

#[tokio::test]
async fn inverted_signature_range_is_a_bad_request() {
    let (status, body) = get(
        app(Upstream::Records(sample_records())),
        "/stats?min_signatures=10&max_signatures=1",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("min_signatures"));
}

#[tokio::test]
async fn unknown_state_is_a_bad_request() {
    let (status, _) = get(app(Upstream::Records(Vec::new())), "/stats?state=archived").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn top_ranks_by_metric() {
    let (status, body) = get(
        app(Upstream::Records(sample_records())),
        "/top?metric=signatures&order=asc&limit=2",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metric"], "signatures");
    assert_eq!(body["defined_count"], 4);
    assert_eq!(body["items"][0]["id"], 1);
    assert_eq!(body["items"][0]["value"], 10);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let (status, _) = get(app(Upstream::Records(Vec::new())), "/top?metric=popularity").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn backlog_lists_every_waiting_kind() {
    let (status, body) = get(app(Upstream::Records(sample_records())), "/backlog").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["as_of"].is_string());
    for kind in ["government_response", "debate_scheduling", "debate_outcome"] {
        assert_eq!(body["waiting"][kind]["count"], 0, "{kind}");
    }
}

#[tokio::test]
async fn upstream_failures_become_user_messages() {
    let (status, body) = get(app(Upstream::Down), "/stats").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "could not load petitions, try again");

    let res = app(Upstream::RateLimited)
        .oneshot(Request::get("/petitions").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.headers()[header::RETRY_AFTER], "42");
}

#[tokio::test]
async fn refresh_invalidates_cached_results() {
    let app = app(Upstream::Records(sample_records()));
    get(app.clone(), "/stats?state=open").await;
    get(app.clone(), "/stats?state=closed").await;

    let (status, body) = call(
        app,
        Request::post("/refresh").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invalidated"], 2);
}

#[tokio::test]
async fn metrics_are_exposed() {
    let app = app(Upstream::Records(sample_records()));
    get(app.clone(), "/stats").await;

    let res = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("petitions_cache_lookups_total"));
}

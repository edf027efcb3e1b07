use std::collections::BTreeSet;
use std::sync::Arc;

use analysis::{
    aggregate, backlog, canonical_records, sort_records, top_petitions, AggregateStats,
    BacklogStats, Metric, PetitionFilter, SortKey, SortOrder, TitleSearch, TopPetitions,
};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use collector::{FilterState, PetitionService};
use normalizer::{NormalizedBatch, PetitionRecord, PetitionState};
use prometheus::Encoder;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::dto::{MalformedEntryDto, PetitionsPageDto, RefreshDto};
use crate::error::{ApiError, ApiResult};

pub struct ApiState {
    pub service: Arc<PetitionService>,
    pub metrics_path: String,
}

pub fn build_router(state: Arc<ApiState>) -> Router {
    let metrics_path = state.metrics_path.clone();
    Router::new()
        .route("/healthz", get(healthz))
        .route("/petitions", get(list_petitions))
        .route("/stats", get(get_stats))
        .route("/backlog", get(get_backlog))
        .route("/top", get(get_top))
        .route("/refresh", post(refresh))
        .route(&metrics_path, get(metrics))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Query parameters shared by every petition view. Fields a view does not
/// use are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct PetitionQuery {
    /// Upstream listing to fetch (`all`, `open`, `awaiting_debate`, ...).
    state: Option<String>,
    /// Comma separated record states applied after normalization.
    status: Option<String>,
    /// Comma separated department names; `Unassigned` selects petitions
    /// without one.
    department: Option<String>,
    min_signatures: Option<u64>,
    max_signatures: Option<u64>,
    q: Option<String>,
    /// `|` separated exact titles. Takes precedence over `q`.
    titles: Option<String>,
    page: Option<usize>,
    per_page: Option<usize>,
    /// Listing column: `id`, `title`, a milestone field or any metric name.
    sort: Option<String>,
    metric: Option<String>,
    order: Option<String>,
    limit: Option<usize>,
}

impl PetitionQuery {
    fn filter_state(&self) -> ApiResult<FilterState> {
        match self.state.as_deref().map(str::trim) {
            None | Some("") => Ok(FilterState::All),
            Some(value) => value.parse().map_err(ApiError::bad_request),
        }
    }

    fn record_filter(&self) -> ApiResult<PetitionFilter> {
        let states = split_list(self.status.as_deref(), ',')
            .map(|value| value.parse::<PetitionState>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(ApiError::bad_request)?;
        let departments = split_list(self.department.as_deref(), ',')
            .map(str::to_string)
            .collect();
        let titles: Vec<String> = split_list(self.titles.as_deref(), '|')
            .map(str::to_string)
            .collect();
        let search = if !titles.is_empty() {
            Some(TitleSearch::Exact(titles))
        } else {
            self.q
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(|q| TitleSearch::Contains(q.to_string()))
        };
        let filter = PetitionFilter {
            states,
            departments,
            min_signatures: self.min_signatures,
            max_signatures: self.max_signatures,
            search,
        };
        filter.validate()?;
        Ok(filter)
    }

    fn sort_order(&self) -> ApiResult<SortOrder> {
        match self.order.as_deref() {
            Some(value) => value.parse().map_err(ApiError::bad_request),
            None => Ok(SortOrder::default()),
        }
    }

    fn sort_key(&self) -> ApiResult<SortKey> {
        match self.sort.as_deref() {
            Some(value) => value.parse().map_err(ApiError::bad_request),
            None => Ok(SortKey::default()),
        }
    }
}

fn split_list(raw: Option<&str>, separator: char) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

/// Runs the pipeline on its own task so a dropped connection does not cancel
/// an upstream fetch that other callers may be waiting on.
async fn load_batch(state: &ApiState, filter: FilterState) -> ApiResult<Arc<NormalizedBatch>> {
    let service = Arc::clone(&state.service);
    let batch = tokio::spawn(async move { service.get_normalized_petitions(filter).await })
        .await??;
    Ok(batch)
}

fn matching<'a>(
    batch: &'a NormalizedBatch,
    filter: &PetitionFilter,
) -> ApiResult<Vec<&'a PetitionRecord>> {
    Ok(filter.apply(batch.records())?)
}

#[instrument(skip(state))]
async fn list_petitions(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PetitionQuery>,
) -> ApiResult<Json<PetitionsPageDto>> {
    let filter_state = query.filter_state()?;
    let filter = query.record_filter()?;
    let sort = query.sort_key()?;
    let order = query.sort_order()?;
    let per_page = query.per_page.unwrap_or(25).clamp(1, 250);
    let page = query.page.unwrap_or(1);

    let batch = load_batch(&state, filter_state).await?;
    let mut records = canonical_records(matching(&batch, &filter)?);
    sort_records(&mut records, sort, order, Utc::now());
    let errors = batch
        .errors()
        .map(|(position, err)| MalformedEntryDto::new(position, err))
        .collect();
    Ok(Json(
        PetitionsPageDto::paginate(filter_state, &records, page, per_page, errors)
            .sorted_by(sort, order),
    ))
}

#[instrument(skip(state))]
async fn get_stats(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PetitionQuery>,
) -> ApiResult<Json<AggregateStats>> {
    let filter_state = query.filter_state()?;
    let filter = query.record_filter()?;
    let batch = load_batch(&state, filter_state).await?;
    let mut stats = aggregate(matching(&batch, &filter)?);
    stats.skipped_count = batch.skipped_count();
    Ok(Json(stats))
}

#[instrument(skip(state))]
async fn get_backlog(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PetitionQuery>,
) -> ApiResult<Json<BacklogStats>> {
    let filter_state = query.filter_state()?;
    let filter = query.record_filter()?;
    let batch = load_batch(&state, filter_state).await?;
    Ok(Json(backlog(matching(&batch, &filter)?, Utc::now())))
}

#[instrument(skip(state))]
async fn get_top(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PetitionQuery>,
) -> ApiResult<Json<TopPetitions>> {
    let filter_state = query.filter_state()?;
    let filter = query.record_filter()?;
    let metric = match query.metric.as_deref() {
        Some(value) => value.parse::<Metric>().map_err(ApiError::bad_request)?,
        None => Metric::Signatures,
    };
    let order = query.sort_order()?;
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let batch = load_batch(&state, filter_state).await?;
    Ok(Json(top_petitions(
        matching(&batch, &filter)?,
        metric,
        order,
        limit,
        Utc::now(),
    )))
}

#[instrument(skip(state))]
async fn refresh(State(state): State<Arc<ApiState>>) -> Json<RefreshDto> {
    let invalidated = state.service.refresh().await;
    Json(RefreshDto { invalidated })
}

async fn metrics() -> ApiResult<impl IntoResponse> {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    let content_type = encoder.format_type().to_string();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok((
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, content_type)],
        buffer,
    ))
}

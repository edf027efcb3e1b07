use analysis::FilterError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use collector::FetchError;
use serde::Serialize;
use tracing::{error, warn};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Fetch(FetchError),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        Self::Fetch(err)
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("pipeline task failed: {err}"))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, retry_after) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Fetch(err) => {
                warn!(kind = err.kind(), error = %err, "petitions fetch failed");
                let status = match err {
                    FetchError::RateLimited { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, err.user_message(), err.retry_after())
            }
            ApiError::Internal(msg) => {
                error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg, None)
            }
        };
        let mut response = (status, Json(ErrorBody { error: message })).into_response();
        if let Some(wait) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&wait.as_secs().max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

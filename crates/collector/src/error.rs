use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

/// Failure of a fetch cycle. Any of these aborts the whole fetch; per-record
/// problems are reported by the normalizer instead.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error requesting {url}: {source:#}")]
    Network {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("rate limited by the petitions API")]
    RateLimited { retry_after: Option<Duration> },
    #[error("unexpected petitions API payload: {reason}")]
    UpstreamFormat { reason: String },
    #[error("pagination stopped after reaching the {max_pages} page limit")]
    PaginationLimitExceeded { max_pages: u32 },
    #[error("petitions API returned {status} for {url}")]
    UnexpectedStatus { status: StatusCode, url: String },
}

impl FetchError {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        Self::UpstreamFormat {
            reason: reason.into(),
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network { .. } => "network",
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::UpstreamFormat { .. } => "upstream_format",
            FetchError::PaginationLimitExceeded { .. } => "pagination_limit",
            FetchError::UnexpectedStatus { .. } => "unexpected_status",
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Message safe to show on the dashboard.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::RateLimited {
                retry_after: Some(wait),
            } => format!(
                "the petitions service is rate limiting requests, try again in {} seconds",
                wait.as_secs().max(1)
            ),
            FetchError::RateLimited { retry_after: None } => {
                "the petitions service is rate limiting requests, try again shortly".to_string()
            }
            _ => "could not load petitions, try again".to_string(),
        }
    }
}

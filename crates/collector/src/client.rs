use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use broker::{parse_retry_after, HttpExec, ReqwestExecutor};
use common::config::PetitionsConfig;
use common::AppError;
use http::{header, Request, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::FetchError;

/// Values the upstream `state` query parameter accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterState {
    #[default]
    All,
    Open,
    Closed,
    Rejected,
    AwaitingResponse,
    WithResponse,
    AwaitingDebate,
    Debated,
    NotDebated,
}

impl FilterState {
    pub const ALL: [FilterState; 9] = [
        FilterState::All,
        FilterState::Open,
        FilterState::Closed,
        FilterState::Rejected,
        FilterState::AwaitingResponse,
        FilterState::WithResponse,
        FilterState::AwaitingDebate,
        FilterState::Debated,
        FilterState::NotDebated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterState::All => "all",
            FilterState::Open => "open",
            FilterState::Closed => "closed",
            FilterState::Rejected => "rejected",
            FilterState::AwaitingResponse => "awaiting_response",
            FilterState::WithResponse => "with_response",
            FilterState::AwaitingDebate => "awaiting_debate",
            FilterState::Debated => "debated",
            FilterState::NotDebated => "not_debated",
        }
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FilterState::ALL
            .into_iter()
            .find(|state| state.as_str() == wanted)
            .ok_or_else(|| format!("unknown petition filter state {s:?}"))
    }
}

/// Opaque continuation token: the upstream `links.next` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(next: impl Into<String>) -> Self {
        Self(next.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct PetitionPage {
    pub records: Vec<Value>,
    pub next_cursor: Option<PageCursor>,
}

#[async_trait]
pub trait PetitionsClient: Send + Sync {
    /// Fetches one page. `cursor` is `None` for the first page. Never retries.
    async fn fetch_petitions(
        &self,
        filter: FilterState,
        cursor: Option<&PageCursor>,
    ) -> Result<PetitionPage, FetchError>;
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    data: Vec<Value>,
    links: ListLinks,
}

#[derive(Debug, Deserialize)]
struct ListLinks {
    #[serde(default)]
    next: Option<String>,
}

pub struct HttpPetitionsClient {
    exec: Arc<dyn HttpExec>,
    base: Url,
    user_agent: String,
}

impl HttpPetitionsClient {
    pub fn new(exec: Arc<dyn HttpExec>, base_url: &str, user_agent: &str) -> common::Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|err| AppError::Other(anyhow::anyhow!("invalid base url {base_url:?}: {err}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            exec,
            base,
            user_agent: user_agent.to_string(),
        })
    }

    pub fn from_config(config: &PetitionsConfig) -> common::Result<Self> {
        let exec = ReqwestExecutor::new(&config.user_agent, config.request_timeout())?;
        Self::new(Arc::new(exec), &config.base_url, &config.user_agent)
    }

    fn first_page_url(&self, filter: FilterState) -> Result<Url, FetchError> {
        let mut url = self
            .base
            .join("petitions.json")
            .map_err(|err| FetchError::format(format!("cannot build list url: {err}")))?;
        url.query_pairs_mut()
            .append_pair("state", filter.as_str())
            .append_pair("page", "1");
        Ok(url)
    }

    /// Cursors must stay on the configured host.
    fn cursor_url(&self, cursor: &PageCursor) -> Result<Url, FetchError> {
        let url = Url::parse(cursor.as_str()).map_err(|err| {
            FetchError::format(format!("next link {:?} is not a url: {err}", cursor.as_str()))
        })?;
        let same_origin = url.host_str() == self.base.host_str()
            && url.port_or_known_default() == self.base.port_or_known_default();
        if !same_origin {
            return Err(FetchError::format(format!(
                "next link {:?} leaves {}",
                cursor.as_str(),
                self.base.host_str().unwrap_or_default()
            )));
        }
        Ok(url)
    }

    async fn get(&self, url: &Url) -> Result<http::Response<Vec<u8>>, FetchError> {
        let network = |source: anyhow::Error| FetchError::Network {
            url: url.to_string(),
            source,
        };
        let request = Request::builder()
            .method("GET")
            .uri(url.as_str())
            .header(header::USER_AGENT, self.user_agent.as_str())
            .header(header::ACCEPT, "application/json")
            .body(Vec::new())
            .map_err(|err| network(err.into()))?;
        self.exec.execute(request).await.map_err(network)
    }
}

#[async_trait]
impl PetitionsClient for HttpPetitionsClient {
    #[instrument(skip(self, filter, cursor), fields(filter = %filter, first_page = cursor.is_none()))]
    async fn fetch_petitions(
        &self,
        filter: FilterState,
        cursor: Option<&PageCursor>,
    ) -> Result<PetitionPage, FetchError> {
        let url = match cursor {
            Some(cursor) => self.cursor_url(cursor)?,
            None => self.first_page_url(filter)?,
        };
        let response = self.get(&url).await?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let advice = parse_retry_after(response.headers());
            warn!(
                url = %url,
                reason = advice.as_ref().map_or("none", |advice| advice.reason),
                wait_secs = advice.as_ref().map(|advice| advice.wait.as_secs()),
                "petitions upstream rate limited"
            );
            return Err(FetchError::RateLimited {
                retry_after: advice.map(|advice| advice.wait),
            });
        }
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status,
                url: url.to_string(),
            });
        }

        let envelope: ListEnvelope = serde_json::from_slice(response.body())
            .map_err(|err| FetchError::format(format!("list body: {err}")))?;
        let next_cursor = envelope
            .links
            .next
            .filter(|next| !next.trim().is_empty())
            .map(PageCursor::new);
        debug!(
            url = %url,
            records = envelope.data.len(),
            has_next = next_cursor.is_some(),
            "fetched petitions page"
        );
        Ok(PetitionPage {
            records: envelope.data,
            next_cursor,
        })
    }
}

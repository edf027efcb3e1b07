use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use common::AppError;
use http::{Request, Response};
use tracing::debug;

use crate::metrics;

/// Transport seam: everything above this trait speaks `http` types only, so
/// tests can swap in canned responses.
#[async_trait]
pub trait HttpExec: Send + Sync {
    async fn execute(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>>;
}

pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    pub fn new(user_agent: &str, timeout: Duration) -> common::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(AppError::http)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpExec for ReqwestExecutor {
    async fn execute(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        let (parts, body) = req.into_parts();
        let started = Instant::now();
        let resp = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body)
            .send()
            .await;
        let resp = match resp {
            Ok(resp) => resp,
            Err(err) => {
                metrics::HTTP_REQUESTS_TOTAL
                    .with_label_values(&["transport_error"])
                    .inc();
                return Err(err.into());
            }
        };
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await?;
        let elapsed = started.elapsed();
        metrics::HTTP_REQUESTS_TOTAL
            .with_label_values(&[metrics::status_class(status.as_u16())])
            .inc();
        metrics::HTTP_LATENCY_SECONDS.observe(elapsed.as_secs_f64());
        debug!(
            status = status.as_u16(),
            bytes = bytes.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "upstream response"
        );

        let mut response = Response::new(bytes.to_vec());
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

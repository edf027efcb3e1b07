use std::time::{Duration, SystemTime};

use http::{header, HeaderMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAdvice {
    pub wait: Duration,
    pub reason: &'static str,
}

/// Reads `Retry-After` as either delta-seconds or an HTTP date. Dates in the
/// past yield a zero wait.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<RetryAdvice> {
    parse_retry_after_at(headers, SystemTime::now())
}

pub fn parse_retry_after_at(headers: &HeaderMap, now: SystemTime) -> Option<RetryAdvice> {
    let value = headers.get(header::RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(RetryAdvice {
            wait: Duration::from_secs(seconds),
            reason: "retry_after",
        });
    }
    let date = httpdate::parse_http_date(value).ok()?;
    Some(RetryAdvice {
        wait: date.duration_since(now).unwrap_or(Duration::ZERO),
        reason: "retry_after_date",
    })
}

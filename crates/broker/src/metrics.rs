use once_cell::sync::Lazy;
use prometheus::{register_histogram, register_int_counter_vec, Histogram, IntCounterVec};

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "broker_http_requests_total",
        "Upstream HTTP requests grouped by response status class",
        &["class"]
    )
    .expect("http requests metric")
});

pub static HTTP_LATENCY_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "broker_http_latency_seconds",
        "Latency of upstream HTTP requests that produced a response",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("http latency metric")
});

pub fn status_class(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        429 => "429",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

pub static FETCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "petitions_fetches_total",
        "Full paginated fetches grouped by outcome",
        &["outcome"]
    )
    .expect("petitions fetches total")
});

pub static FETCH_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "petitions_fetch_duration_seconds",
        "Duration of a full paginated fetch in seconds",
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    )
    .expect("petitions fetch duration histogram")
});

pub static PAGES_FETCHED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "petitions_pages_fetched_total",
        "Result pages successfully retrieved from the petitions API"
    )
    .expect("petitions pages fetched")
});

pub static RATE_LIMIT_RETRIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "petitions_rate_limit_retries_total",
        "Page requests retried after the petitions API rate limited them"
    )
    .expect("petitions rate limit retries")
});

pub static RECORDS_NORMALIZED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "petitions_records_normalized_total",
        "Raw petition records normalized grouped by outcome",
        &["outcome"]
    )
    .expect("petitions records normalized")
});

pub static CACHE_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "petitions_cache_lookups_total",
        "Result cache lookups grouped by hit or miss",
        &["result"]
    )
    .expect("petitions cache lookups")
});

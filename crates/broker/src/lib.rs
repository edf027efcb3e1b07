pub mod backoff;
pub mod exec;
pub mod metrics;
pub mod retry;

pub use backoff::exponential_jitter_backoff;
pub use exec::{HttpExec, ReqwestExecutor};
pub use retry::{parse_retry_after, RetryAdvice};

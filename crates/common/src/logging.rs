use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber once. `RUST_LOG` takes precedence over
/// `default_level`; transport crates stay at `warn` otherwise.
pub fn init_logging(default_level: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(default_level));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("{level},hyper=warn,reqwest=warn,rustls=warn"))
}

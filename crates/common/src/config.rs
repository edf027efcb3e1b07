use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub petitions: PetitionsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(".")
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/default")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/local")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }
}

/// Upstream petitions API.
#[derive(Debug, Clone, Deserialize)]
pub struct PetitionsConfig {
    #[serde(default = "PetitionsConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "PetitionsConfig::default_user_agent")]
    pub user_agent: String,
    #[serde(default = "PetitionsConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Upper bound on pages followed for a single fetch.
    #[serde(default = "PetitionsConfig::default_max_pages")]
    pub max_pages: u32,
}

impl PetitionsConfig {
    fn default_base_url() -> String {
        "https://petition.parliament.uk/".to_string()
    }

    fn default_user_agent() -> String {
        "petitions-lab".to_string()
    }

    const fn default_request_timeout_secs() -> u64 {
        30
    }

    const fn default_max_pages() -> u32 {
        2000
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for PetitionsConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            user_agent: Self::default_user_agent(),
            request_timeout_secs: Self::default_request_timeout_secs(),
            max_pages: Self::default_max_pages(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "CacheConfig::default_capacity")]
    pub capacity: usize,
}

impl CacheConfig {
    const fn default_ttl_secs() -> u64 {
        300
    }

    const fn default_capacity() -> usize {
        16
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: Self::default_ttl_secs(),
            capacity: Self::default_capacity(),
        }
    }
}

/// Caller-side retry policy applied when the upstream rate limits a page.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "RetryConfig::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "RetryConfig::default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "RetryConfig::default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    #[serde(default = "RetryConfig::default_jitter_frac")]
    pub jitter_frac: f32,
}

impl RetryConfig {
    const fn default_max_attempts() -> u32 {
        3
    }

    const fn default_backoff_base_ms() -> u64 {
        500
    }

    const fn default_backoff_max_ms() -> u64 {
        30_000
    }

    const fn default_jitter_frac() -> f32 {
        0.2
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            backoff_base_ms: Self::default_backoff_base_ms(),
            backoff_max_ms: Self::default_backoff_max_ms(),
            jitter_frac: Self::default_jitter_frac(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "ApiConfig::default_bind")]
    pub bind: String,
}

impl ApiConfig {
    fn default_bind() -> String {
        "127.0.0.1:8080".to_string()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: Self::default_bind(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "ObservabilityConfig::default_metrics_path")]
    pub metrics_path: String,
}

impl ObservabilityConfig {
    fn default_metrics_path() -> String {
        "/metrics".to_string()
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_path: Self::default_metrics_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(
                "[petitions]\nmax_pages = 5\n\n[cache]\nttl_secs = 60\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.petitions.max_pages, 5);
        assert_eq!(config.petitions.base_url, "https://petition.parliament.uk/");
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
        assert_eq!(config.cache.capacity, 16);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.observability.metrics_path, "/metrics");
    }
}

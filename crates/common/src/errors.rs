pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("http error: {0}")]
    Http(#[source] anyhow::Error),
    #[error("invalid timestamp {0:?}")]
    Timestamp(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn http(err: impl Into<anyhow::Error>) -> Self {
        Self::Http(err.into())
    }
}

pub mod config;
pub mod errors;
pub mod logging;
pub mod text;
pub mod time;

pub use crate::config::AppConfig;
pub use crate::errors::{AppError, Result};

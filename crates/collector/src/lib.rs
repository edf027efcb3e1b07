pub mod cache;
pub mod client;
pub mod error;
pub mod metrics;
pub mod pager;
pub mod service;

pub use cache::{CacheKey, ResultCache};
pub use client::{FilterState, HttpPetitionsClient, PageCursor, PetitionPage, PetitionsClient};
pub use error::FetchError;
pub use pager::Pager;
pub use service::PetitionService;

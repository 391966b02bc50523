//! External collaborators of the feed engine
//!
//! The catalog source supplies records; the ranking and search oracles order
//! identifiers. Oracles are best-effort: every caller treats their errors as a
//! signal to fall back, never as a user-visible failure.
use crate::{
    error::{AppError, AppResult},
    models::{CatalogProjection, UserInteractions, VideoRecord},
};

pub mod catalog;
pub mod generative;

pub use catalog::{CachedCatalog, HttpCatalogSource};
pub use generative::GenerativeOracle;

/// Source of the raw, unordered video catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetches every available record. Failures propagate to the caller.
    async fn fetch(&self) -> AppResult<Vec<VideoRecord>>;
}

/// Predicts relevance for the current viewer
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RankingOracle: Send + Sync {
    /// Returns identifiers ordered by predicted relevance
    ///
    /// The sequence may be empty, partial, or reference ids the catalog does
    /// not contain.
    async fn rank(
        &self,
        catalog: &[VideoRecord],
        interactions: &UserInteractions,
    ) -> AppResult<Vec<String>>;
}

/// Matches free-text intent against the catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchOracle: Send + Sync {
    /// Returns identifiers of matching records, best match first
    async fn search(&self, query: &str, projection: &[CatalogProjection])
        -> AppResult<Vec<String>>;
}

/// Oracle used when no API key is configured; every call fails open
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledOracle;

#[async_trait::async_trait]
impl RankingOracle for DisabledOracle {
    async fn rank(
        &self,
        _catalog: &[VideoRecord],
        _interactions: &UserInteractions,
    ) -> AppResult<Vec<String>> {
        Err(AppError::ExternalApi("Ranking oracle not configured".to_string()))
    }
}

#[async_trait::async_trait]
impl SearchOracle for DisabledOracle {
    async fn search(
        &self,
        _query: &str,
        _projection: &[CatalogProjection],
    ) -> AppResult<Vec<String>> {
        Err(AppError::ExternalApi("Search oracle not configured".to_string()))
    }
}

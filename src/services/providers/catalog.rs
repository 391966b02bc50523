//! Catalog source over HTTP, plus a persisted snapshot layer
//!
//! The endpoint may answer with a bare JSON array of entries or with an
//! object wrapping them in `resources` (the media-host listing layout).
use std::sync::Arc;

use chrono::Duration;
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    cached,
    db::{KeyValueStore, StoreKey},
    error::{AppError, AppResult},
    models::{ApiCatalogEntry, CatalogSnapshot, VideoRecord},
    services::providers::CatalogSource,
};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogPayload {
    Entries(Vec<ApiCatalogEntry>),
    Resources { resources: Vec<ApiCatalogEntry> },
}

impl CatalogPayload {
    fn into_records(self) -> Vec<VideoRecord> {
        let entries = match self {
            CatalogPayload::Entries(entries) => entries,
            CatalogPayload::Resources { resources } => resources,
        };
        let total = entries.len();

        let videos: Vec<VideoRecord> = entries
            .into_iter()
            .filter_map(ApiCatalogEntry::into_record)
            .collect();

        if videos.len() < total {
            tracing::debug!(
                dropped = total - videos.len(),
                "Catalog entries without identifiers skipped"
            );
        }

        videos
    }
}

#[derive(Clone)]
pub struct HttpCatalogSource {
    http_client: HttpClient,
    catalog_url: String,
}

impl HttpCatalogSource {
    pub fn new(catalog_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            catalog_url,
        }
    }
}

#[async_trait::async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch(&self) -> AppResult<Vec<VideoRecord>> {
        let response = self.http_client.get(&self.catalog_url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Catalog endpoint returned status {}: {}",
                status, body
            )));
        }

        let payload: CatalogPayload = response.json().await?;
        let videos = payload.into_records();

        tracing::info!(count = videos.len(), "Catalog fetched");

        Ok(videos)
    }
}

/// Serves the last persisted catalog while it is younger than `ttl`
pub struct CachedCatalog {
    inner: Arc<dyn CatalogSource>,
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl CachedCatalog {
    pub fn new(inner: Arc<dyn CatalogSource>, store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { inner, store, ttl }
    }
}

#[async_trait::async_trait]
impl CatalogSource for CachedCatalog {
    async fn fetch(&self) -> AppResult<Vec<VideoRecord>> {
        let ttl = self.ttl;
        let snapshot = cached!(
            self.store,
            StoreKey::CatalogSnapshot,
            |s: &CatalogSnapshot| s.is_fresh(ttl),
            async { Ok::<_, AppError>(CatalogSnapshot::new(self.inner.fetch().await?)) }
        )?;

        Ok(snapshot.videos)
    }
}

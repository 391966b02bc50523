use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
    db::{KeyValueStore, StoreKey},
    error::{AppError, AppResult},
    models::VideoRecord,
    services::{
        interactions::InteractionStore,
        providers::{CatalogSource, RankingOracle},
    },
};

/// Resolves an oracle identifier against the catalog
///
/// Tries the primary id across the whole catalog first, then the
/// `public_id` alias.
pub fn resolve_identifier<'a>(catalog: &'a [VideoRecord], identifier: &str) -> Option<&'a VideoRecord> {
    catalog
        .iter()
        .find(|v| v.id == identifier)
        .or_else(|| catalog.iter().find(|v| v.public_id.as_deref() == Some(identifier)))
}

/// Merges the oracle's ordering with the full catalog
///
/// Resolved oracle ids come first, in oracle order; unresolvable ids are
/// dropped and a record already placed is not placed again. Every record whose
/// primary id does not appear in `oracle_order` follows in catalog order.
///
/// Membership for the remainder is checked on primary ids only. A record the
/// oracle named solely by its `public_id` therefore appears in both parts.
pub fn compose_feed(catalog: &[VideoRecord], oracle_order: &[String]) -> Vec<VideoRecord> {
    let mut placed: HashSet<&str> = HashSet::new();
    let mut feed: Vec<VideoRecord> = Vec::with_capacity(catalog.len());

    for identifier in oracle_order {
        if let Some(video) = resolve_identifier(catalog, identifier) {
            if placed.insert(video.id.as_str()) {
                feed.push(video.clone());
            }
        }
    }

    let referenced: HashSet<&str> = oracle_order.iter().map(String::as_str).collect();
    feed.extend(
        catalog
            .iter()
            .filter(|v| !referenced.contains(v.id.as_str()))
            .cloned(),
    );

    feed
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Completed { count: usize },
    /// Another refresh was already running
    Skipped,
}

/// Clears the in-flight flag however the refresh ends
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Holds the composed feed and runs the fetch → rank → compose pipeline
pub struct FeedService {
    catalog: Arc<dyn CatalogSource>,
    ranking: Arc<dyn RankingOracle>,
    interactions: Arc<InteractionStore>,
    store: Arc<dyn KeyValueStore>,
    feed: RwLock<Arc<Vec<VideoRecord>>>,
    refreshing: AtomicBool,
}

impl FeedService {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        ranking: Arc<dyn RankingOracle>,
        interactions: Arc<InteractionStore>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            catalog,
            ranking,
            interactions,
            store,
            feed: RwLock::new(Arc::new(Vec::new())),
            refreshing: AtomicBool::new(false),
        }
    }

    /// Last composed feed; empty until the first successful refresh
    pub async fn current(&self) -> Arc<Vec<VideoRecord>> {
        self.feed.read().await.clone()
    }

    /// Recomposes the feed
    ///
    /// A hard refresh first removes the persisted catalog snapshot so the
    /// catalog is fetched again. The previous feed is served until the new one
    /// is composed, and stays in place if the reload fails. A call made while
    /// another refresh is running returns `Skipped` and changes nothing.
    pub async fn refresh(&self, hard: bool) -> AppResult<RefreshOutcome> {
        if self.refreshing.swap(true, Ordering::AcqRel) {
            tracing::info!(hard, "Refresh already in flight, skipping");
            return Ok(RefreshOutcome::Skipped);
        }
        let _guard = RefreshGuard(&self.refreshing);

        if hard {
            if let Err(e) = self.store.remove(&StoreKey::CatalogSnapshot) {
                tracing::warn!(error = %e, "Failed to clear persisted catalog");
            }
        }

        let feed = self.load().await?;
        Ok(RefreshOutcome::Completed { count: feed.len() })
    }

    /// Runs fetch → rank → compose and stores the result, without the overlap check
    pub async fn load(&self) -> AppResult<Arc<Vec<VideoRecord>>> {
        let start = Instant::now();

        let catalog = self.catalog.fetch().await.map_err(|e| {
            tracing::error!(error = %e, "Catalog fetch failed");
            AppError::CatalogUnavailable(e.to_string())
        })?;

        let interactions = self.interactions.snapshot();
        let oracle_order = match self.ranking.rank(&catalog, &interactions).await {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(error = %e, "Ranking oracle failed, using catalog order");
                Vec::new()
            }
        };

        let feed = Arc::new(compose_feed(&catalog, &oracle_order));
        *self.feed.write().await = feed.clone();

        tracing::info!(
            catalog = catalog.len(),
            ranked = oracle_order.len(),
            feed = feed.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Feed composed"
        );

        Ok(feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{CatalogSnapshot, VideoType};
    use crate::services::providers::{MockCatalogSource, MockRankingOracle};
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn video(id: &str, public_id: Option<&str>) -> VideoRecord {
        VideoRecord {
            id: id.to_string(),
            public_id: public_id.map(str::to_string),
            title: format!("Title {}", id),
            category: "رعب".to_string(),
            video_type: VideoType::Short,
            video_url: format!("https://cdn.local/{}.mp4", id),
            poster_url: None,
        }
    }

    fn catalog() -> Vec<VideoRecord> {
        vec![video("A", Some("pub/a")), video("B", Some("pub/b")), video("C", None)]
    }

    fn ids(feed: &[VideoRecord]) -> Vec<&str> {
        feed.iter().map(|v| v.id.as_str()).collect()
    }

    fn order(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn counts(feed: &[VideoRecord]) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for v in feed {
            *counts.entry(v.id.as_str()).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_oracle_order_takes_precedence() {
        let feed = compose_feed(&catalog(), &order(&["B", "A"]));
        assert_eq!(ids(&feed), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_empty_oracle_keeps_catalog_order() {
        let feed = compose_feed(&catalog(), &[]);
        assert_eq!(ids(&feed), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_every_record_exactly_once() {
        let cases = [
            order(&[]),
            order(&["C"]),
            order(&["ghost", "B", "ghost2"]),
            order(&["C", "C", "A", "C"]),
            order(&["A", "B", "C"]),
        ];

        for oracle in cases {
            let feed = compose_feed(&catalog(), &oracle);
            let counts = counts(&feed);
            assert_eq!(feed.len(), 3, "oracle {:?}", oracle);
            assert!(counts.values().all(|&n| n == 1), "oracle {:?}", oracle);
        }
    }

    #[test]
    fn test_unknown_ids_dropped() {
        let feed = compose_feed(&catalog(), &order(&["nope", "C"]));
        assert_eq!(ids(&feed), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_alias_resolves_in_oracle_part() {
        let feed = compose_feed(&catalog(), &order(&["pub/b", "B"]));
        assert_eq!(ids(&feed), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_alias_only_reference_also_lands_in_remainder() {
        // Remainder membership uses primary ids only, so B shows up twice.
        let feed = compose_feed(&catalog(), &order(&["pub/b"]));
        assert_eq!(ids(&feed), vec!["B", "A", "B", "C"]);
    }

    #[test]
    fn test_resolve_prefers_primary_id() {
        let catalog = vec![video("X", Some("Y")), video("Y", None)];
        assert_eq!(resolve_identifier(&catalog, "Y").unwrap().id, "Y");
        assert_eq!(resolve_identifier(&catalog, "X").unwrap().id, "X");
        assert!(resolve_identifier(&catalog, "Z").is_none());
    }

    fn service(
        catalog: MockCatalogSource,
        ranking: MockRankingOracle,
        store: Arc<dyn KeyValueStore>,
    ) -> FeedService {
        let interactions = Arc::new(InteractionStore::open(store.clone()));
        FeedService::new(Arc::new(catalog), Arc::new(ranking), interactions, store)
    }

    #[tokio::test]
    async fn test_refresh_composes_with_oracle() {
        let mut source = MockCatalogSource::new();
        source.expect_fetch().returning(|| Ok(catalog()));

        let mut ranking = MockRankingOracle::new();
        ranking
            .expect_rank()
            .withf(|catalog, _| catalog.len() == 3)
            .returning(|_, _| Ok(vec!["C".to_string()]));

        let feed = service(source, ranking, Arc::new(MemoryStore::new()));
        let outcome = assert_ok!(feed.refresh(false).await);

        assert_eq!(outcome, RefreshOutcome::Completed { count: 3 });
        assert_eq!(ids(&feed.current().await), vec!["C", "A", "B"]);
    }

    #[tokio::test]
    async fn test_ranking_failure_falls_back_to_catalog_order() {
        let mut source = MockCatalogSource::new();
        source.expect_fetch().returning(|| Ok(catalog()));

        let mut ranking = MockRankingOracle::new();
        ranking
            .expect_rank()
            .returning(|_, _| Err(AppError::ExternalApi("quota".to_string())));

        let feed = service(source, ranking, Arc::new(MemoryStore::new()));
        feed.refresh(false).await.unwrap();

        assert_eq!(ids(&feed.current().await), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_catalog_failure_propagates_and_keeps_feed() {
        let mut source = MockCatalogSource::new();
        let mut calls = 0;
        source.expect_fetch().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(catalog())
            } else {
                Err(AppError::ExternalApi("offline".to_string()))
            }
        });

        let mut ranking = MockRankingOracle::new();
        ranking.expect_rank().returning(|_, _| Ok(Vec::new()));

        let feed = service(source, ranking, Arc::new(MemoryStore::new()));
        feed.refresh(false).await.unwrap();

        let err = assert_err!(feed.refresh(false).await);
        assert!(matches!(err, AppError::CatalogUnavailable(_)));
        assert_eq!(feed.current().await.len(), 3);
    }

    #[tokio::test]
    async fn test_ranking_sees_current_interactions() {
        let mut source = MockCatalogSource::new();
        source.expect_fetch().returning(|| Ok(catalog()));

        let mut ranking = MockRankingOracle::new();
        ranking
            .expect_rank()
            .withf(|_, interactions| interactions.is_liked("B"))
            .times(1)
            .returning(|_, _| Ok(vec!["B".to_string()]));

        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let interactions = Arc::new(InteractionStore::open(store.clone()));
        interactions.like("B");

        let feed = FeedService::new(Arc::new(source), Arc::new(ranking), interactions, store);
        feed.refresh(false).await.unwrap();
        assert_eq!(ids(&feed.current().await)[0], "B");
    }

    #[tokio::test]
    async fn test_hard_refresh_clears_persisted_catalog() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store
            .set_json(&StoreKey::CatalogSnapshot, &CatalogSnapshot::new(catalog()))
            .unwrap();

        let mut source = MockCatalogSource::new();
        source.expect_fetch().returning(|| Ok(catalog()));
        let mut ranking = MockRankingOracle::new();
        ranking.expect_rank().returning(|_, _| Ok(Vec::new()));

        let feed = service(source, ranking, store.clone());
        feed.refresh(true).await.unwrap();

        assert!(store.get(&StoreKey::CatalogSnapshot).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_hard_refresh_keeps_previous_feed() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let mut source = MockCatalogSource::new();
        let mut calls = 0;
        source.expect_fetch().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(catalog())
            } else {
                Err(AppError::ExternalApi("offline".to_string()))
            }
        });
        let mut ranking = MockRankingOracle::new();
        ranking.expect_rank().times(1).returning(|_, _| Ok(vec!["C".to_string()]));

        let feed = service(source, ranking, store.clone());
        assert_ok!(feed.refresh(false).await);
        store
            .set_json(&StoreKey::CatalogSnapshot, &CatalogSnapshot::new(catalog()))
            .unwrap();

        let err = assert_err!(feed.refresh(true).await);
        assert!(matches!(err, AppError::CatalogUnavailable(_)));

        // The snapshot is still invalidated, but the served feed survives.
        assert!(store.get(&StoreKey::CatalogSnapshot).unwrap().is_none());
        assert_eq!(ids(&feed.current().await), vec!["C", "A", "B"]);
    }

    struct SlowCatalog;

    #[async_trait::async_trait]
    impl CatalogSource for SlowCatalog {
        async fn fetch(&self) -> AppResult<Vec<VideoRecord>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(catalog())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_refresh_is_skipped() {
        let mut ranking = MockRankingOracle::new();
        ranking.expect_rank().times(1).returning(|_, _| Ok(Vec::new()));

        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let interactions = Arc::new(InteractionStore::open(store.clone()));
        let feed = FeedService::new(Arc::new(SlowCatalog), Arc::new(ranking), interactions, store);

        let (first, second) = tokio::join!(feed.refresh(false), feed.refresh(true));
        assert_eq!(first.unwrap(), RefreshOutcome::Completed { count: 3 });
        assert_eq!(second.unwrap(), RefreshOutcome::Skipped);

        // The flag is released once the first refresh finishes.
        assert!(!feed.refreshing.load(Ordering::Acquire));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_refresh_serves_previous_feed_while_loading() {
        let mut ranking = MockRankingOracle::new();
        ranking.expect_rank().times(2).returning(|_, _| Ok(Vec::new()));

        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let interactions = Arc::new(InteractionStore::open(store.clone()));
        let feed = FeedService::new(Arc::new(SlowCatalog), Arc::new(ranking), interactions, store);
        feed.refresh(false).await.unwrap();

        let (refreshed, during) = tokio::join!(feed.refresh(true), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            feed.current().await.len()
        });

        assert_eq!(during, 3);
        assert_eq!(refreshed.unwrap(), RefreshOutcome::Completed { count: 3 });
    }
}

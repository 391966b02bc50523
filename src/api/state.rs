use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::Config,
    db::{create_redis_client, KeyValueStore, MemoryStore, RedisStore},
    services::{
        feed::FeedService,
        interactions::InteractionStore,
        providers::{
            CachedCatalog, CatalogSource, DisabledOracle, GenerativeOracle, HttpCatalogSource,
            RankingOracle, SearchOracle,
        },
        search::SearchEngine,
    },
};

/// External collaborators the engine is built from
pub struct Collaborators {
    pub store: Arc<dyn KeyValueStore>,
    pub catalog: Arc<dyn CatalogSource>,
    pub ranking: Arc<dyn RankingOracle>,
    pub search: Arc<dyn SearchOracle>,
}

/// Tunables for the derived views and search
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub categories: Vec<String>,
    pub discovery_count: usize,
    pub search_debounce: Duration,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<FeedService>,
    pub interactions: Arc<InteractionStore>,
    pub search: Arc<SearchEngine>,
    pub categories: Arc<Vec<String>>,
    pub discovery_count: usize,
}

impl AppState {
    pub fn new(collaborators: Collaborators, settings: EngineSettings) -> Self {
        let Collaborators {
            store,
            catalog,
            ranking,
            search,
        } = collaborators;

        let interactions = Arc::new(InteractionStore::open(store.clone()));
        let feed = FeedService::new(catalog, ranking, interactions.clone(), store);

        Self {
            feed: Arc::new(feed),
            interactions,
            search: Arc::new(SearchEngine::new(search, settings.search_debounce)),
            categories: Arc::new(settings.categories),
            discovery_count: settings.discovery_count,
        }
    }

    /// Wires the production collaborators described by `config`
    ///
    /// Without a Redis URL state lives in process memory; without an oracle key
    /// ranking and search always fall back.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = match &config.redis_url {
            Some(redis_url) => {
                tracing::info!("Persisting state to Redis");
                Arc::new(RedisStore::new(create_redis_client(redis_url)?))
            }
            None => {
                tracing::warn!("REDIS_URL not set, state will not survive a restart");
                Arc::new(MemoryStore::new())
            }
        };

        let catalog = Arc::new(CachedCatalog::new(
            Arc::new(HttpCatalogSource::new(config.catalog_url.clone())),
            store.clone(),
            chrono::Duration::seconds(config.catalog_cache_ttl_secs as i64),
        ));

        let (ranking, search): (Arc<dyn RankingOracle>, Arc<dyn SearchOracle>) =
            match &config.oracle_api_key {
                Some(api_key) => {
                    let oracle = Arc::new(GenerativeOracle::new(
                        api_key.clone(),
                        config.oracle_api_url.clone(),
                        config.oracle_model.clone(),
                        Duration::from_millis(config.oracle_timeout_ms),
                    )?);
                    let ranking: Arc<dyn RankingOracle> = oracle.clone();
                    let search: Arc<dyn SearchOracle> = oracle;
                    (ranking, search)
                }
                None => {
                    tracing::warn!("ORACLE_API_KEY not set, using catalog order and substring search");
                    let ranking: Arc<dyn RankingOracle> = Arc::new(DisabledOracle);
                    let search: Arc<dyn SearchOracle> = Arc::new(DisabledOracle);
                    (ranking, search)
                }
            };

        Ok(Self::new(
            Collaborators {
                store,
                catalog,
                ranking,
                search,
            },
            EngineSettings {
                categories: config.categories.clone(),
                discovery_count: config.discovery_count,
                search_debounce: Duration::from_millis(config.search_debounce_ms),
            },
        ))
    }
}

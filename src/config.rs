use serde::Deserialize;

/// Category labels used when `CATEGORIES` is unset
pub const DEFAULT_CATEGORIES: [&str; 7] = [
    "رعب حقيقي ✴️",
    "رعب الحيوانات 🔱",
    "هجمات مرعبة ✴️",
    "أخطر المشاهد 🔱",
    "رعب الحديقة ⚠️",
    "رعب كوميدي 😂 ⚠️",
    "لحظات مرعبة",
];

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Redis connection URL; interactions stay in memory when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Endpoint returning the video catalog as JSON
    pub catalog_url: String,

    /// API key for the generative ranking/search oracle
    #[serde(default)]
    pub oracle_api_key: Option<String>,

    /// Oracle API base URL
    #[serde(default = "default_oracle_api_url")]
    pub oracle_api_url: String,

    /// Oracle model name
    #[serde(default = "default_oracle_model")]
    pub oracle_model: String,

    /// Per-request timeout for oracle calls
    #[serde(default = "default_oracle_timeout_ms")]
    pub oracle_timeout_ms: u64,

    /// Quiet period before a search query is submitted
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// How long a persisted catalog snapshot is served before refetching
    #[serde(default = "default_catalog_cache_ttl_secs")]
    pub catalog_cache_ttl_secs: u64,

    /// Category labels, comma separated
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// Number of videos in the discovery section
    #[serde(default = "default_discovery_count")]
    pub discovery_count: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_oracle_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_oracle_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_oracle_timeout_ms() -> u64 {
    15_000
}

fn default_search_debounce_ms() -> u64 {
    600
}

fn default_catalog_cache_ttl_secs() -> u64 {
    3600
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

fn default_discovery_count() -> usize {
    4
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_iter(std::env::vars())
    }

    fn from_iter<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_applied() {
        let config =
            Config::from_iter(vars(&[("CATALOG_URL", "http://catalog.local/videos")])).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.search_debounce_ms, 600);
        assert_eq!(config.discovery_count, 4);
        assert_eq!(config.categories.len(), 7);
        assert!(config.redis_url.is_none());
        assert!(config.oracle_api_key.is_none());
    }

    #[test]
    fn test_categories_parsed_from_comma_list() {
        let config = Config::from_iter(vars(&[
            ("CATALOG_URL", "http://catalog.local/videos"),
            ("CATEGORIES", "garden horror,animal attacks"),
        ]))
        .unwrap();

        assert_eq!(config.categories, vec!["garden horror", "animal attacks"]);
    }

    #[test]
    fn test_missing_catalog_url_fails() {
        assert!(Config::from_iter(vars(&[("PORT", "8080")])).is_err());
    }
}

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub mod interactions;
pub mod stats;
pub mod video;

pub use interactions::{UserInteractions, WatchEntry};
pub use stats::{format_big_number, VideoStats};
pub use video::{ApiCatalogEntry, CatalogProjection, VideoRecord, VideoType};

/// A video the viewer left part-way through
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContinuationEntry {
    pub video: VideoRecord,
    pub progress: f64,
}

/// Catalog as persisted between sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub videos: Vec<VideoRecord>,
    pub cached_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    pub fn new(videos: Vec<VideoRecord>) -> Self {
        Self {
            videos,
            cached_at: Utc::now(),
        }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        Utc::now() - self.cached_at < ttl
    }
}

/// Long videos sharing a category label
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryRow {
    pub label: String,
    pub videos: Vec<VideoRecord>,
}

/// Every section of the home screen
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HomeSections {
    pub discovery: Vec<VideoRecord>,
    pub continue_watching: Vec<ContinuationEntry>,
    pub featured_longs: Vec<VideoRecord>,
    pub quick_shorts: Vec<VideoRecord>,
    pub category_rows: Vec<CategoryRow>,
}

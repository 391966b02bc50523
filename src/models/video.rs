use serde::{Deserialize, Serialize};

/// Playback format of a catalog video
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    Short,
    Long,
}

/// A video as supplied by the catalog source
///
/// Records are immutable within a session; the engine only reorders and
/// filters references to them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoRecord {
    /// Primary identifier
    pub id: String,
    /// Secondary alias used when matching oracle output
    #[serde(default)]
    pub public_id: Option<String>,
    pub title: String,
    /// Free-text label, may hold several space separated tokens
    pub category: String,
    #[serde(rename = "type")]
    pub video_type: VideoType,
    pub video_url: String,
    #[serde(default)]
    pub poster_url: Option<String>,
}

impl VideoRecord {
    /// Two-key match: primary id first, then the `public_id` alias
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.id == identifier || self.public_id.as_deref() == Some(identifier)
    }

    /// Key older watch-history entries were recorded under
    pub fn media_key(&self) -> &str {
        &self.video_url
    }

    pub fn is_short(&self) -> bool {
        self.video_type == VideoType::Short
    }

    pub fn is_long(&self) -> bool {
        self.video_type == VideoType::Long
    }

    /// True when the category field contains the label's leading token
    pub fn in_category(&self, label: &str) -> bool {
        self.category.contains(leading_token(label))
    }
}

/// Portion of a category label before the first space
pub fn leading_token(label: &str) -> &str {
    label.split(' ').next().unwrap_or(label)
}

/// Reduced view of a record handed to oracles
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogProjection {
    pub id: String,
    pub title: String,
    pub category: String,
}

impl From<&VideoRecord> for CatalogProjection {
    fn from(video: &VideoRecord) -> Self {
        Self {
            id: video.id.clone(),
            title: video.title.clone(),
            category: video.category.clone(),
        }
    }
}

// ============================================================================
// Catalog API Types
// ============================================================================

/// Raw catalog entry as returned by the catalog endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCatalogEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub public_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "type", default)]
    pub video_type: Option<String>,
    #[serde(alias = "secure_url")]
    pub video_url: String,
    #[serde(default)]
    pub poster_url: Option<String>,
}

impl ApiCatalogEntry {
    /// Converts to a record; entries carrying neither id nor public_id are unusable
    pub fn into_record(self) -> Option<VideoRecord> {
        let id = self.id.or_else(|| self.public_id.clone())?;

        let video_type = match self.video_type.as_deref() {
            Some("long") => VideoType::Long,
            _ => VideoType::Short,
        };

        Some(VideoRecord {
            id,
            public_id: self.public_id,
            title: self.title,
            category: self.category,
            video_type,
            video_url: self.video_url,
            poster_url: self.poster_url,
        })
    }
}

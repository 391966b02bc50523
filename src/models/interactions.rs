use serde::{Deserialize, Serialize};

/// Watch progress for one video
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchEntry {
    pub id: String,
    /// Fraction watched, in [0, 1]
    pub progress: f64,
}

/// Accumulated viewer signals, persisted as one unit
///
/// Field names match the stored JSON layout (`likedIds`, `dislikedIds`,
/// `savedIds`, `watchHistory`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserInteractions {
    #[serde(default)]
    pub liked_ids: Vec<String>,
    /// Exclusion list applied by every feed consumer
    #[serde(default)]
    pub disliked_ids: Vec<String>,
    #[serde(default)]
    pub saved_ids: Vec<String>,
    /// One entry per video ever started, in first-watch order
    #[serde(default)]
    pub watch_history: Vec<WatchEntry>,
}

impl UserInteractions {
    /// Creates an empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_liked(&self, id: &str) -> bool {
        self.liked_ids.iter().any(|x| x == id)
    }

    pub fn is_disliked(&self, id: &str) -> bool {
        self.disliked_ids.iter().any(|x| x == id)
    }

    pub fn is_saved(&self, id: &str) -> bool {
        self.saved_ids.iter().any(|x| x == id)
    }

    pub fn progress_of(&self, id: &str) -> Option<f64> {
        self.watch_history
            .iter()
            .find(|h| h.id == id)
            .map(|h| h.progress)
    }

    /// Likes a video, clearing any dislike. Returns false when already liked.
    pub fn like(&mut self, id: &str) -> bool {
        if self.is_liked(id) {
            return false;
        }
        self.liked_ids.push(id.to_string());
        self.disliked_ids.retain(|x| x != id);
        true
    }

    /// Dislikes a video, clearing any like
    pub fn dislike(&mut self, id: &str) -> bool {
        let was_liked = self.is_liked(id);
        self.liked_ids.retain(|x| x != id);

        if self.is_disliked(id) {
            return was_liked;
        }
        self.disliked_ids.push(id.to_string());
        true
    }

    /// Removes a video from the exclusion list only
    pub fn restore(&mut self, id: &str) -> bool {
        let before = self.disliked_ids.len();
        self.disliked_ids.retain(|x| x != id);
        self.disliked_ids.len() != before
    }

    pub fn bookmark(&mut self, id: &str) -> bool {
        if self.is_saved(id) {
            return false;
        }
        self.saved_ids.push(id.to_string());
        true
    }

    /// Upserts watch progress; an existing entry only moves forward
    pub fn record_progress(&mut self, id: &str, progress: f64) -> bool {
        if !progress.is_finite() {
            return false;
        }
        let progress = progress.clamp(0.0, 1.0);

        if let Some(existing) = self.watch_history.iter_mut().find(|h| h.id == id) {
            if progress > existing.progress {
                existing.progress = progress;
                return true;
            }
            return false;
        }

        self.watch_history.push(WatchEntry {
            id: id.to_string(),
            progress,
        });
        true
    }

    /// Restores the aggregate invariants on data read back from storage
    ///
    /// Duplicate ids collapse to their first occurrence, an id present in both
    /// liked and disliked stays disliked only, and duplicate history entries
    /// merge into the first one keeping the highest progress.
    pub fn sanitized(self) -> Self {
        let mut clean = Self::new();

        for id in self.disliked_ids {
            if !clean.is_disliked(&id) {
                clean.disliked_ids.push(id);
            }
        }
        for id in self.liked_ids {
            if !clean.is_liked(&id) && !clean.is_disliked(&id) {
                clean.liked_ids.push(id);
            }
        }
        for id in self.saved_ids {
            clean.bookmark(&id);
        }
        for entry in self.watch_history {
            clean.record_progress(&entry.id, entry.progress);
        }

        clean
    }
}

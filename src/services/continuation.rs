use std::collections::HashSet;

use crate::models::{ContinuationEntry, VideoRecord, WatchEntry};

/// Progress at or below this counts as not started
pub const MIN_PROGRESS: f64 = 0.05;
/// Progress at or above this counts as finished
pub const MAX_PROGRESS: f64 = 0.95;

/// Derives the "continue watching" list from watch history
///
/// History is walked newest first. Entries strictly between the two bounds are
/// resolved against the catalog by primary id, or by media URL for entries
/// recorded under that key. Each video appears once, at its most recent
/// position. No length cap is applied here.
pub fn continue_watching(history: &[WatchEntry], catalog: &[VideoRecord]) -> Vec<ContinuationEntry> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut result = Vec::new();

    for entry in history.iter().rev() {
        if entry.progress <= MIN_PROGRESS || entry.progress >= MAX_PROGRESS {
            continue;
        }

        let Some(video) = catalog
            .iter()
            .find(|v| v.id == entry.id || v.media_key() == entry.id)
        else {
            continue;
        };

        if seen.insert(video.id.as_str()) {
            result.push(ContinuationEntry {
                video: video.clone(),
                progress: entry.progress,
            });
        }
    }

    result
}

//! Presentation-ready views derived from the composed feed
//!
//! The composed feed keeps disliked records; everything here that is shown to
//! the viewer goes through [`visible`] first.
use serde::Deserialize;

use crate::{
    models::{CategoryRow, HomeSections, UserInteractions, VideoRecord},
    services::{
        continuation::continue_watching,
        sampler::{sample_discovery, RandomSource},
    },
};

const FEATURED_LONGS: usize = 4;
const QUICK_SHORTS_START: usize = 4;
const QUICK_SHORTS_END: usize = 30;

/// Feed minus everything the viewer disliked
pub fn visible(feed: &[VideoRecord], interactions: &UserInteractions) -> Vec<VideoRecord> {
    feed.iter()
        .filter(|v| !interactions.is_disliked(&v.id))
        .cloned()
        .collect()
}

pub fn home_sections(
    feed: &[VideoRecord],
    interactions: &UserInteractions,
    categories: &[String],
    discovery_count: usize,
    rng: &mut dyn RandomSource,
) -> HomeSections {
    let shown = visible(feed, interactions);
    let longs: Vec<&VideoRecord> = shown.iter().filter(|v| v.is_long()).collect();
    let shorts: Vec<&VideoRecord> = shown.iter().filter(|v| v.is_short()).collect();

    let category_rows = categories
        .iter()
        .filter_map(|label| {
            let videos: Vec<VideoRecord> = longs
                .iter()
                .filter(|v| v.in_category(label))
                .map(|v| (*v).clone())
                .collect();
            (!videos.is_empty()).then(|| CategoryRow {
                label: label.clone(),
                videos,
            })
        })
        .collect();

    HomeSections {
        discovery: sample_discovery(&shown, categories, discovery_count, rng),
        continue_watching: continue_watching(&interactions.watch_history, feed),
        featured_longs: longs.iter().take(FEATURED_LONGS).map(|v| (*v).clone()).collect(),
        quick_shorts: shorts
            .iter()
            .skip(QUICK_SHORTS_START)
            .take(QUICK_SHORTS_END - QUICK_SHORTS_START)
            .map(|v| (*v).clone())
            .collect(),
        category_rows,
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Shelf {
    Liked,
    Saved,
    /// Disliked records, listed so they can be restored
    Hidden,
}

impl Shelf {
    fn ids<'a>(&self, interactions: &'a UserInteractions) -> &'a [String] {
        match self {
            Shelf::Liked => &interactions.liked_ids,
            Shelf::Saved => &interactions.saved_ids,
            Shelf::Hidden => &interactions.disliked_ids,
        }
    }
}

/// Feed records on a shelf, in feed order
pub fn library(feed: &[VideoRecord], interactions: &UserInteractions, shelf: Shelf) -> Vec<VideoRecord> {
    let ids = shelf.ids(interactions);

    feed.iter()
        .filter(|v| ids.iter().any(|id| v.matches_identifier(id)))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayList {
    Short,
    Long,
    #[default]
    All,
}

impl PlayList {
    pub fn select(&self, videos: &[VideoRecord]) -> Vec<VideoRecord> {
        videos
            .iter()
            .filter(|v| match self {
                PlayList::Short => v.is_short(),
                PlayList::Long => v.is_long(),
                PlayList::All => true,
            })
            .cloned()
            .collect()
    }
}

/// Record after `current_id`, wrapping to the start
///
/// Lists of one or zero records have no next, and neither does an id the
/// list does not contain.
pub fn next_in_list<'a>(list: &'a [VideoRecord], current_id: &str) -> Option<&'a VideoRecord> {
    if list.len() <= 1 {
        return None;
    }

    let index = list.iter().position(|v| v.id == current_id)?;
    list.get((index + 1) % list.len())
}

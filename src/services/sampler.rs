use std::collections::HashSet;

use rand::Rng;

use crate::models::VideoRecord;

/// Uniform draws for sampling
///
/// Injected so tests can replace the thread RNG with a scripted sequence.
pub trait RandomSource {
    /// Returns an index uniformly drawn from `0..upper`; `upper` is never zero
    fn next_index(&mut self, upper: usize) -> usize;
}

/// Thread-local RNG, unseeded
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_index(&mut self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }
}

/// Fisher-Yates shuffle driven by the given source
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = rng.next_index(i + 1);
        items.swap(i, j);
    }
}

/// Picks up to `target` short videos spread across categories
///
/// Categories are visited in random order; each contributes one random short
/// whose category contains the label's leading token. Remaining slots are
/// backfilled from unpicked shorts in catalog order. No video is picked twice,
/// even when the input lists a record more than once.
pub fn sample_discovery(
    catalog: &[VideoRecord],
    categories: &[String],
    target: usize,
    rng: &mut dyn RandomSource,
) -> Vec<VideoRecord> {
    let mut seen: HashSet<&str> = HashSet::new();
    let shorts: Vec<&VideoRecord> = catalog
        .iter()
        .filter(|v| v.is_short() && seen.insert(v.id.as_str()))
        .collect();
    let mut picked: Vec<&VideoRecord> = Vec::with_capacity(target);

    let mut labels: Vec<&String> = categories.iter().collect();
    shuffle(&mut labels, rng);

    for label in labels {
        if picked.len() >= target {
            break;
        }

        let matching: Vec<&VideoRecord> = shorts
            .iter()
            .copied()
            .filter(|v| v.in_category(label) && !picked.iter().any(|p| p.id == v.id))
            .collect();

        if !matching.is_empty() {
            picked.push(matching[rng.next_index(matching.len())]);
        }
    }

    if picked.len() < target {
        let backfill: Vec<&VideoRecord> = shorts
            .iter()
            .copied()
            .filter(|v| !picked.iter().any(|p| p.id == v.id))
            .take(target - picked.len())
            .collect();
        picked.extend(backfill);
    }

    picked.into_iter().cloned().collect()
}

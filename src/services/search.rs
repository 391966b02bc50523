use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use crate::{
    models::{CatalogProjection, VideoRecord},
    services::providers::SearchOracle,
};

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    #[default]
    Idle,
    Debouncing,
    Querying,
    Resolved,
    /// The oracle failed and results come from substring matching
    Fallback,
}

impl SearchPhase {
    pub fn is_settled(&self) -> bool {
        matches!(self, SearchPhase::Idle | SearchPhase::Resolved | SearchPhase::Fallback)
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SearchSnapshot {
    pub sequence: u64,
    pub query: String,
    pub phase: SearchPhase,
    pub results: Vec<VideoRecord>,
}

/// Sequence counter plus the published snapshot
struct SearchSession {
    latest: AtomicU64,
    state: watch::Sender<SearchSnapshot>,
}

impl SearchSession {
    fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn is_current(&self, sequence: u64) -> bool {
        self.latest.load(Ordering::Acquire) == sequence
    }

    /// Publishes `next` only if its sequence is still the latest issued
    ///
    /// The check runs under the channel's write lock, so a submission issued
    /// concurrently can never be overwritten by an older one.
    fn publish(&self, next: SearchSnapshot) -> bool {
        self.state.send_if_modified(|current| {
            if !self.is_current(next.sequence) {
                return false;
            }
            *current = next;
            true
        })
    }
}

/// Debounced, last-submitted-wins search over the current feed
pub struct SearchEngine {
    oracle: Arc<dyn SearchOracle>,
    debounce: Duration,
    session: Arc<SearchSession>,
}

impl SearchEngine {
    pub fn new(oracle: Arc<dyn SearchOracle>, debounce: Duration) -> Self {
        let (state, _) = watch::channel(SearchSnapshot::default());

        Self {
            oracle,
            debounce,
            session: Arc::new(SearchSession {
                latest: AtomicU64::new(0),
                state,
            }),
        }
    }

    /// Submits a query and returns its sequence number
    ///
    /// Any submission still debouncing or querying is superseded. Blank
    /// queries resolve to an empty result at once without reaching the oracle.
    pub fn submit(&self, query: &str, catalog: Arc<Vec<VideoRecord>>) -> u64 {
        let session = self.session.clone();
        let sequence = session.issue();
        let query = query.to_string();

        if query.trim().is_empty() {
            session.publish(SearchSnapshot {
                sequence,
                query,
                phase: SearchPhase::Resolved,
                results: Vec::new(),
            });
            return sequence;
        }

        session.publish(SearchSnapshot {
            sequence,
            query: query.clone(),
            phase: SearchPhase::Debouncing,
            results: Vec::new(),
        });

        let oracle = self.oracle.clone();
        let debounce = self.debounce;

        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            if !session.is_current(sequence) {
                tracing::debug!(sequence, query = %query, "Search superseded before submission");
                return;
            }

            session.publish(SearchSnapshot {
                sequence,
                query: query.clone(),
                phase: SearchPhase::Querying,
                results: Vec::new(),
            });

            let projection = project_catalog(&catalog);
            let (phase, results) = match oracle.search(&query, &projection).await {
                Ok(ids) => (SearchPhase::Resolved, resolve_search_results(&catalog, &ids)),
                Err(e) => {
                    tracing::warn!(error = %e, query = %query, "Search oracle failed, using substring match");
                    (SearchPhase::Fallback, fallback_matches(&catalog, &query))
                }
            };
            let count = results.len();

            let applied = session.publish(SearchSnapshot {
                sequence,
                query: query.clone(),
                phase,
                results,
            });

            if applied {
                tracing::info!(sequence, query = %query, ?phase, results = count, "Search settled");
            } else {
                tracing::debug!(sequence, query = %query, "Stale search result discarded");
            }
        });

        sequence
    }

    /// Returns to idle and supersedes pending work
    pub fn clear(&self) -> u64 {
        let sequence = self.session.issue();
        self.session.publish(SearchSnapshot {
            sequence,
            ..SearchSnapshot::default()
        });
        sequence
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.session.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.session.state.subscribe()
    }
}

/// Reduced catalog sent to the search oracle
pub fn project_catalog(catalog: &[VideoRecord]) -> Vec<CatalogProjection> {
    catalog.iter().map(CatalogProjection::from).collect()
}

/// Maps oracle ids to records by primary id, keeping oracle order
///
/// Unknown ids are dropped and a repeated id keeps its first position.
pub fn resolve_search_results(catalog: &[VideoRecord], ids: &[String]) -> Vec<VideoRecord> {
    let mut seen: HashSet<&str> = HashSet::new();

    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .filter_map(|id| catalog.iter().find(|v| &v.id == id))
        .cloned()
        .collect()
}

/// Records whose title or category contains the query, ignoring case
///
/// A record listed more than once is returned once, at its first position.
pub fn fallback_matches(catalog: &[VideoRecord], query: &str) -> Vec<VideoRecord> {
    let needle = query.to_lowercase();
    let mut seen: HashSet<&str> = HashSet::new();

    catalog
        .iter()
        .filter(|v| {
            v.title.to_lowercase().contains(&needle) || v.category.to_lowercase().contains(&needle)
        })
        .filter(|v| seen.insert(v.id.as_str()))
        .cloned()
        .collect()
}

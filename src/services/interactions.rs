use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    db::{KeyValueStore, StoreKey},
    error::AppResult,
    models::UserInteractions,
};

/// Owner of the viewer's interaction aggregate
///
/// Mutations are applied in call order against the in-memory copy, and every
/// one that changes it writes the whole aggregate back before returning.
/// Nothing else writes interaction state.
pub struct InteractionStore {
    store: Arc<dyn KeyValueStore>,
    state: Mutex<UserInteractions>,
}

impl InteractionStore {
    /// Opens the store, loading whatever was persisted
    pub fn open(store: Arc<dyn KeyValueStore>) -> Self {
        let state = Self::read(store.as_ref());
        tracing::info!(
            liked = state.liked_ids.len(),
            disliked = state.disliked_ids.len(),
            saved = state.saved_ids.len(),
            history = state.watch_history.len(),
            "Interactions loaded"
        );

        Self {
            store,
            state: Mutex::new(state),
        }
    }

    /// Reads the persisted aggregate; missing or malformed data yields the empty one
    pub fn load(&self) -> UserInteractions {
        Self::read(self.store.as_ref())
    }

    /// Writes the full aggregate in a single `set`
    pub fn save(&self, state: &UserInteractions) -> AppResult<()> {
        self.store.set_json(&StoreKey::Interactions, state)
    }

    /// Current in-memory aggregate
    pub fn snapshot(&self) -> UserInteractions {
        self.lock().clone()
    }

    pub fn like(&self, id: &str) -> UserInteractions {
        self.mutate("like", id, |s| s.like(id))
    }

    pub fn dislike(&self, id: &str) -> UserInteractions {
        self.mutate("dislike", id, |s| s.dislike(id))
    }

    /// Un-hides a previously disliked video
    pub fn restore(&self, id: &str) -> UserInteractions {
        self.mutate("restore", id, |s| s.restore(id))
    }

    pub fn save_bookmark(&self, id: &str) -> UserInteractions {
        self.mutate("save_bookmark", id, |s| s.bookmark(id))
    }

    pub fn record_progress(&self, id: &str, progress: f64) -> UserInteractions {
        self.mutate("record_progress", id, |s| s.record_progress(id, progress))
    }

    /// Drops every signal and persists the empty aggregate
    pub fn reset(&self) -> UserInteractions {
        self.mutate("reset", "*", |s| {
            let changed = *s != UserInteractions::default();
            *s = UserInteractions::default();
            changed
        })
    }

    fn read(store: &dyn KeyValueStore) -> UserInteractions {
        match store.get_json::<UserInteractions>(&StoreKey::Interactions) {
            Ok(Some(state)) => state.sanitized(),
            Ok(None) => UserInteractions::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored interactions unreadable, starting empty");
                UserInteractions::default()
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, UserInteractions> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate<F>(&self, op: &'static str, id: &str, apply: F) -> UserInteractions
    where
        F: FnOnce(&mut UserInteractions) -> bool,
    {
        let mut state = self.lock();

        if apply(&mut state) {
            // The lock is held across the write so writes land in mutation order.
            if let Err(e) = self.save(&state) {
                tracing::error!(error = %e, op, video_id = %id, "Failed to persist interactions");
            } else {
                tracing::debug!(op, video_id = %id, "Interactions persisted");
            }
        }

        state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Memory store that counts writes
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        writes: AtomicUsize,
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &StoreKey) -> AppResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &StoreKey, value: &str) -> AppResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }

        fn remove(&self, key: &StoreKey) -> AppResult<()> {
            self.inner.remove(key)
        }
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &StoreKey) -> AppResult<Option<String>> {
            Err(AppError::Internal("disk gone".to_string()))
        }

        fn set(&self, _key: &StoreKey, _value: &str) -> AppResult<()> {
            Err(AppError::Internal("disk gone".to_string()))
        }

        fn remove(&self, _key: &StoreKey) -> AppResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_open_with_nothing_stored() {
        let store = InteractionStore::open(Arc::new(MemoryStore::new()));
        assert_eq!(store.snapshot(), UserInteractions::default());
    }

    #[test]
    fn test_malformed_record_resets_to_empty() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(&StoreKey::Interactions, "{\"likedIds\": 5").unwrap();

        let store = InteractionStore::open(backend);
        assert_eq!(store.load(), UserInteractions::default());
        assert_eq!(store.snapshot(), UserInteractions::default());
    }

    #[test]
    fn test_unreadable_backend_never_fails_load() {
        let store = InteractionStore::open(Arc::new(BrokenStore));
        assert_eq!(store.load(), UserInteractions::default());

        // Writes fail but the in-memory state still moves.
        let state = store.like("v1");
        assert!(state.is_liked("v1"));
    }

    #[test]
    fn test_mutations_survive_reopen() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let store = InteractionStore::open(backend.clone());
        store.like("v1");
        store.dislike("v2");
        store.save_bookmark("v3");
        store.record_progress("v4", 0.42);

        let reopened = InteractionStore::open(backend);
        let state = reopened.snapshot();
        assert!(state.is_liked("v1"));
        assert!(state.is_disliked("v2"));
        assert!(state.is_saved("v3"));
        assert_eq!(state.progress_of("v4"), Some(0.42));
    }

    #[test]
    fn test_every_change_writes_once() {
        let backend = Arc::new(CountingStore::default());
        let store = InteractionStore::open(backend.clone());

        store.like("v1");
        store.like("v1");
        store.dislike("v1");
        store.record_progress("v2", 0.3);
        store.record_progress("v2", 0.1);

        // The repeated like and the backwards progress change nothing.
        assert_eq!(backend.writes.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_progress_monotonic_through_store() {
        let store = InteractionStore::open(Arc::new(MemoryStore::new()));
        store.record_progress("v1", 0.3);
        let state = store.record_progress("v1", 0.1);
        assert_eq!(state.progress_of("v1"), Some(0.3));
        assert_eq!(store.load().progress_of("v1"), Some(0.3));
    }

    #[test]
    fn test_restore_removes_only_dislike() {
        let store = InteractionStore::open(Arc::new(MemoryStore::new()));
        store.dislike("v1");
        let state = store.restore("v1");
        assert!(!state.is_disliked("v1"));
        assert!(!state.is_liked("v1"));
    }

    #[test]
    fn test_reset_clears_persisted_state() {
        let store = InteractionStore::open(Arc::new(MemoryStore::new()));
        store.like("v1");
        store.record_progress("v2", 0.5);

        let state = store.reset();
        assert_eq!(state, UserInteractions::default());
        assert_eq!(store.load(), UserInteractions::default());
    }
}

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Mutex;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Interactions,
    CatalogSnapshot,
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKey::Interactions => write!(f, "interactions:v5"),
            StoreKey::CatalogSnapshot => write!(f, "catalog:snapshot"),
        }
    }
}

/// Synchronous text key-value persistence
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &StoreKey) -> AppResult<Option<String>>;

    fn set(&self, key: &StoreKey, value: &str) -> AppResult<()>;

    fn remove(&self, key: &StoreKey) -> AppResult<()>;
}

impl<'a> dyn KeyValueStore + 'a {
    /// Reads and deserializes a JSON value
    ///
    /// An absent key is `Ok(None)`; unparseable text is an error so callers
    /// can decide whether to treat it as a miss.
    pub fn get_json<T: serde::de::DeserializeOwned>(&self, key: &StoreKey) -> AppResult<Option<T>> {
        match self.get(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Serializes a value and writes it in one `set`
    pub fn set_json<T: serde::Serialize>(&self, key: &StoreKey, value: &T) -> AppResult<()> {
        let json = serde_json::to_string(value)?;
        self.set(key, &json)
    }
}

/// Process-local store, used when no Redis URL is configured and in tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::Internal("Memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &StoreKey) -> AppResult<Option<String>> {
        Ok(self.entries()?.get(&key.to_string()).cloned())
    }

    fn set(&self, key: &StoreKey, value: &str) -> AppResult<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &StoreKey) -> AppResult<()> {
        self.entries()?.remove(&key.to_string());
        Ok(())
    }
}

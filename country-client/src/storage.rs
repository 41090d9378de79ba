//! Persistent key/value storage for the client cache
//!
//! `KeyValueStore` is the local-storage seam: string values under string keys.
//! `PersistentCache` layers the `{data, timestamp}` blob and TTL policy on top.

use chrono::Utc;
use common::errors::AppError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// String storage keyed by name, like browser local storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// Stores each key as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Uses the platform cache directory (`~/.cache/country-lookup/` on Linux).
    /// Returns `None` when no home directory can be determined.
    pub fn new() -> Option<Self> {
        let dirs = ProjectDirs::from("", "", "country-lookup")?;
        Some(Self {
            dir: dirs.cache_dir().to_path_buf(),
        })
    }

    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        match fs::read_to_string(self.path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Non-persistent store, for tests and `--no-cache` runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry<T> {
    data: T,
    /// Unix milliseconds
    timestamp: i64,
}

/// A persisted value read back with its age
#[derive(Debug)]
pub struct Persisted<T> {
    pub data: T,
    pub timestamp: i64,
    pub is_expired: bool,
}

/// Typed `{data, timestamp}` blob under one fixed key.
///
/// Unparsable content is removed on read. Expired content stays in place
/// so `read_any` can still serve it as a last resort.
pub struct PersistentCache<T> {
    store: Arc<dyn KeyValueStore>,
    key: String,
    ttl: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PersistentCache<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            ttl,
            _marker: PhantomData,
        }
    }

    /// Value only if younger than the TTL
    pub fn read_fresh(&self) -> Option<T> {
        let entry = self.read()?;
        if entry.is_expired {
            debug!(key = %self.key, "Persistent cache expired");
            return None;
        }
        info!(key = %self.key, "Loading from persistent cache");
        Some(entry.data)
    }

    /// Value regardless of age
    pub fn read_any(&self) -> Option<T> {
        self.read().map(|entry| entry.data)
    }

    pub fn read(&self) -> Option<Persisted<T>> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Persistent cache unavailable");
                return None;
            }
        };

        match serde_json::from_str::<StoredEntry<T>>(&raw) {
            Ok(entry) => {
                let age_ms = Utc::now().timestamp_millis().saturating_sub(entry.timestamp);
                let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
                Some(Persisted {
                    data: entry.data,
                    timestamp: entry.timestamp,
                    is_expired: age_ms >= ttl_ms,
                })
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Persistent cache corrupt, clearing");
                if let Err(e) = self.store.remove(&self.key) {
                    warn!(key = %self.key, error = %e, "Failed to clear corrupt cache");
                }
                None
            }
        }
    }

    pub fn write(&self, data: &T) -> Result<(), AppError> {
        let entry = StoredEntry {
            data,
            timestamp: Utc::now().timestamp_millis(),
        };
        let json = serde_json::to_string(&entry)?;
        self.store.set(&self.key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn memory_cache(ttl: Duration) -> (Arc<MemoryStore>, PersistentCache<Vec<String>>) {
        let store = Arc::new(MemoryStore::new());
        let cache = PersistentCache::new(store.clone(), "countriesCache", ttl);
        (store, cache)
    }

    #[test]
    fn test_read_after_write_returns_same_data() {
        let (_, cache) = memory_cache(Duration::from_secs(60));
        let data = vec!["Turkey".to_string(), "Georgia".to_string()];

        cache.write(&data).unwrap();

        assert_eq!(cache.read_fresh(), Some(data));
    }

    #[test]
    fn test_expired_entry_is_a_miss_but_still_readable() {
        let (store, cache) = memory_cache(Duration::from_secs(60));
        store
            .set(
                "countriesCache",
                &json!({ "data": ["Turkey"], "timestamp": 0 }).to_string(),
            )
            .unwrap();

        assert_eq!(cache.read_fresh(), None);
        assert_eq!(cache.read_any(), Some(vec!["Turkey".to_string()]));
        assert!(store.get("countriesCache").unwrap().is_some());
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let (store, cache) = memory_cache(Duration::MAX);
        store
            .set(
                "countriesCache",
                &json!({ "data": ["Turkey"], "timestamp": 0 }).to_string(),
            )
            .unwrap();

        assert_eq!(cache.read_fresh(), Some(vec!["Turkey".to_string()]));
    }

    #[test]
    fn test_corrupt_entry_is_cleared() {
        let (store, cache) = memory_cache(Duration::from_secs(60));
        store.set("countriesCache", "{not json").unwrap();

        assert_eq!(cache.read_any(), None);
        assert!(store.get("countriesCache").unwrap().is_none());
    }

    #[test]
    fn test_blob_layout() {
        let (store, cache) = memory_cache(Duration::from_secs(60));
        cache.write(&vec!["Turkey".to_string()]).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&store.get("countriesCache").unwrap().unwrap()).unwrap();

        assert_eq!(raw["data"], json!(["Turkey"]));
        assert!(raw["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_file_store_roundtrip_and_remove() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::with_dir(temp_dir.path().join("nested"));

        assert_eq!(store.get("countriesCache").unwrap(), None);

        store.set("countriesCache", "[1,2]").unwrap();
        assert!(temp_dir.path().join("nested/countriesCache.json").exists());
        assert_eq!(store.get("countriesCache").unwrap().as_deref(), Some("[1,2]"));

        store.remove("countriesCache").unwrap();
        store.remove("countriesCache").unwrap();
        assert_eq!(store.get("countriesCache").unwrap(), None);
    }
}

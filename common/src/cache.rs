use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    pub stored_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// Cache service with an explicit TTL policy.
///
/// `get` only returns entries younger than the TTL; `get_stale` returns
/// whatever is stored, however old, for fallback paths. Entries are never
/// evicted on expiry, only overwritten or invalidated.
#[async_trait]
pub trait CacheStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    fn ttl(&self) -> Duration;

    async fn get(&self, key: &str) -> Option<V>;

    async fn get_stale(&self, key: &str) -> Option<V>;

    async fn set(&self, key: &str, value: V);

    /// Returns whether an entry existed.
    async fn invalidate(&self, key: &str) -> bool;
}

/// In-memory `CacheStore` backed by a `RwLock<HashMap>`
pub struct TtlCache<V> {
    cache: Arc<RwLock<HashMap<String, CacheEntry<V>>>>,
    ttl: Duration,
}

impl<V> TtlCache<V> {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }
}

#[async_trait]
impl<V> CacheStore<V> for TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn get(&self, key: &str) -> Option<V> {
        let cache = self.cache.read().await;
        if let Some(entry) = cache.get(key)
            && entry.is_fresh(self.ttl)
        {
            return Some(entry.data.clone());
        }
        None
    }

    async fn get_stale(&self, key: &str) -> Option<V> {
        let cache = self.cache.read().await;
        cache.get(key).map(|entry| entry.data.clone())
    }

    async fn set(&self, key: &str, value: V) {
        let mut cache = self.cache.write().await;
        cache.insert(
            key.to_string(),
            CacheEntry {
                data: value,
                stored_at: Instant::now(),
            },
        );
    }

    async fn invalidate(&self, key: &str) -> bool {
        let mut cache = self.cache.write().await;
        cache.remove(key).is_some()
    }
}

//! In-memory cache backend.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{CacheError, CacheStore, CachedAsset};

#[derive(Debug, Clone)]
struct Record {
    asset: CachedAsset,
    /// `None` when the TTL runs past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl Record {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// A thread-safe, process-local cache.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Arc<DashMap<String, Record>>,
    default_ttl: Duration,
}

impl MemoryCache {
    /// Create a new empty cache.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            default_ttl,
        }
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<CachedAsset>, CacheError> {
        let now = Instant::now();
        let live = match self.inner.get(key) {
            None => return Ok(None),
            Some(record) if record.is_live(now) => Some(record.asset.clone()),
            Some(_) => None,
        };
        // Read guard must be released before removal.
        if live.is_none() {
            self.inner.remove_if(key, |_, record| !record.is_live(now));
        }
        Ok(live)
    }

    fn set(&self, key: &str, asset: CachedAsset, ttl: Option<Duration>) -> Result<(), CacheError> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.inner.insert(
            key.to_string(),
            Record {
                asset,
                expires_at: Instant::now().checked_add(ttl),
            },
        );
        Ok(())
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn asset(body: &'static str) -> CachedAsset {
        CachedAsset {
            payload: Bytes::from_static(body.as_bytes()),
            content_type: "text/css".into(),
        }
    }

    #[test]
    fn test_cache_operations() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        let key = "https://fonts.googleapis.com/css2?family=Roboto";

        assert!(cache.get(key).unwrap().is_none());

        cache.set(key, asset("a"), None).unwrap();
        assert_eq!(cache.get(key).unwrap(), Some(asset("a")));

        // Last write wins
        cache.set(key, asset("b"), Some(Duration::from_secs(60))).unwrap();
        assert_eq!(cache.get(key).unwrap(), Some(asset("b")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_key_is_exact() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache
            .set("https://fonts.googleapis.com/css2?family=Roboto", asset("a"), None)
            .unwrap();

        assert!(cache
            .get("https://fonts.googleapis.com/css2?family=roboto")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_expired_entry_is_absent_and_removed() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.set("k", asset("a"), Some(Duration::ZERO)).unwrap();

        assert!(cache.get("k").unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.set("k", asset("a"), Some(Duration::MAX)).unwrap();
        cache.set("j", asset("b"), Some(Duration::from_secs(u64::MAX))).unwrap();

        assert_eq!(cache.get("k").unwrap(), Some(asset("a")));
        assert_eq!(cache.get("j").unwrap(), Some(asset("b")));
    }

    #[test]
    fn test_concurrent_writers() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    cache.set(&format!("k{}", i % 4), asset("x"), None).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 4);
    }
}

//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! pipeline (fully-qualified upstream URL as key)
//!     → CacheStore::get  → hit: stored payload + content type
//!     → CacheStore::set  → after a successful upstream fetch
//!
//! Backends:
//!     memory.rs (DashMap, process lifetime)
//!     disk.rs   (one file per key, survives restarts)
//! ```
//!
//! # Design Decisions
//! - Keys are the exact upstream URL string, no normalization
//! - Expiry is wall-clock TTL only; no size bound, no LRU
//! - Concurrent writes to the same key are last-write-wins
//! - The store is created once at startup and injected into the pipeline

pub mod disk;
pub mod memory;

use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::config::{CacheBackendKind, CacheConfig};

pub use disk::DiskCache;
pub use memory::MemoryCache;

/// TTL a store applies when a write carries no explicit TTL.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// TTL the pipeline assigns to every successful upstream fetch.
pub const FETCH_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors raised by cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt cache entry: {0}")]
    Corrupt(String),
}

/// A cached upstream response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
    pub payload: Bytes,
    pub content_type: String,
}

/// Key-value store for upstream responses with per-entry expiry.
///
/// Implementations must tolerate concurrent reads and concurrent writes.
/// Calls may block on I/O; async callers should run them off the runtime.
pub trait CacheStore: Send + Sync {
    /// Look up a live entry. Expired entries are reported as absent.
    fn get(&self, key: &str) -> Result<Option<CachedAsset>, CacheError>;

    /// Store an entry. `None` applies the store's default TTL.
    fn set(&self, key: &str, asset: CachedAsset, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// TTL applied by `set` when none is given.
    fn default_ttl(&self) -> Duration;
}

/// Build the configured cache store.
pub fn open_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    match config.backend {
        CacheBackendKind::Memory => {
            tracing::info!(default_ttl_secs = config.default_ttl_secs, "Using in-memory cache");
            Ok(Arc::new(MemoryCache::new(config.default_ttl())))
        }
        CacheBackendKind::Disk => {
            let store = DiskCache::open(&config.directory, config.default_ttl())?;
            if config.purge_on_startup {
                let removed = store.purge_expired()?;
                tracing::info!(removed, "Purged expired cache entries");
            }
            tracing::info!(
                directory = %config.directory,
                default_ttl_secs = config.default_ttl_secs,
                "Using disk cache"
            );
            Ok(Arc::new(store))
        }
    }
}

/// Seconds since the unix epoch, saturating at zero for pre-epoch clocks.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_policy() {
        assert_eq!(DEFAULT_TTL.as_secs(), 300);
        assert_eq!(FETCH_TTL.as_secs(), 86_400);
        assert!(FETCH_TTL > DEFAULT_TTL);
    }

    #[test]
    fn test_open_memory_store() {
        let config = CacheConfig {
            backend: CacheBackendKind::Memory,
            ..CacheConfig::default()
        };
        let store = open_store(&config).unwrap();
        assert_eq!(store.default_ttl(), DEFAULT_TTL);
    }

    #[test]
    fn test_open_disk_store_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("fonts");
        let config = CacheConfig {
            directory: cache_dir.to_string_lossy().into_owned(),
            ..CacheConfig::default()
        };

        let store = open_store(&config).unwrap();
        assert!(cache_dir.is_dir());
        assert!(store.get("https://fonts.gstatic.com/a.ttf").unwrap().is_none());
    }
}

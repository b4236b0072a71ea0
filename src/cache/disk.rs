//! Persistent on-disk cache backend.
//!
//! # File Format
//! ```text
//! <cache dir>/<sha256(key) hex>.entry
//!     {"key":"https://...","content_type":"font/woff2","expires_at":1760000000}\n
//!     <raw payload bytes>
//! ```
//!
//! # Design Decisions
//! - Writes go to a unique temp file and are renamed into place (last write wins)
//! - Expired entries are deleted lazily on read; `purge_expired` sweeps the directory
//! - Expiry is stored as unix seconds so it survives restarts

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{unix_now, CacheError, CacheStore, CachedAsset};

const ENTRY_EXTENSION: &str = "entry";
const TEMP_EXTENSION: &str = "tmp";

#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    key: String,
    content_type: String,
    expires_at: u64,
}

impl EntryHeader {
    fn is_expired(&self, now: u64) -> bool {
        self.expires_at <= now
    }
}

/// File-per-key cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
    default_ttl: Duration,
}

impl DiskCache {
    /// Open (creating if needed) a cache directory.
    pub fn open(root: impl AsRef<Path>, default_ttl: Duration) -> Result<Self, CacheError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root, default_ttl })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root.join(format!("{}.{}", hex::encode(digest), ENTRY_EXTENSION))
    }

    /// Delete every expired entry and any leftover temp file. Returns the number removed.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = unix_now();
        let mut removed = 0;

        for dir_entry in fs::read_dir(&self.root)? {
            let path = dir_entry?.path();
            let stale = match path.extension().and_then(|e| e.to_str()) {
                Some(TEMP_EXTENSION) => true,
                Some(ENTRY_EXTENSION) => match read_header(&path) {
                    Ok(Some((header, _))) => header.is_expired(now),
                    Ok(None) => false,
                    Err(e) => {
                        tracing::warn!(path = ?path, error = %e, "Dropping unreadable cache entry");
                        true
                    }
                },
                _ => false,
            };

            if stale && remove_quietly(&path) {
                removed += 1;
            }
        }

        Ok(removed)
    }
}

impl CacheStore for DiskCache {
    fn get(&self, key: &str) -> Result<Option<CachedAsset>, CacheError> {
        let path = self.entry_path(key);
        let (header, mut reader) = match read_header(&path)? {
            Some(found) => found,
            None => return Ok(None),
        };

        // Digest collision or foreign file.
        if header.key != key {
            return Ok(None);
        }

        if header.is_expired(unix_now()) {
            tracing::debug!(key = %key, "Cache entry expired");
            remove_quietly(&path);
            return Ok(None);
        }

        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;

        Ok(Some(CachedAsset {
            payload: Bytes::from(payload),
            content_type: header.content_type,
        }))
    }

    fn set(&self, key: &str, asset: CachedAsset, ttl: Option<Duration>) -> Result<(), CacheError> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let header = EntryHeader {
            key: key.to_string(),
            content_type: asset.content_type,
            expires_at: unix_now().saturating_add(ttl.as_secs()),
        };
        let header_line =
            serde_json::to_vec(&header).map_err(|e| CacheError::Corrupt(e.to_string()))?;

        let final_path = self.entry_path(key);
        let temp_path =
            final_path.with_extension(format!("{}.{}", uuid::Uuid::new_v4(), TEMP_EXTENSION));

        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(&header_line)?;
            file.write_all(b"\n")?;
            file.write_all(&asset.payload)?;
            file.sync_all()?;
            fs::rename(&temp_path, &final_path)
        };

        if let Err(e) = write() {
            remove_quietly(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

/// Read the header line of an entry file, leaving the reader at the payload.
fn read_header(path: &Path) -> Result<Option<(EntryHeader, BufReader<fs::File>)>, CacheError> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    if line.last() != Some(&b'\n') {
        return Err(CacheError::Corrupt(format!("missing header in {}", path.display())));
    }
    line.pop();

    let header: EntryHeader =
        serde_json::from_slice(&line).map_err(|e| CacheError::Corrupt(e.to_string()))?;
    Ok(Some((header, reader)))
}

fn remove_quietly(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(path = ?path, error = %e, "Failed to remove cache file");
            false
        }
    }
}

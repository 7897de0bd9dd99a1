//! Cache backend implementations.
//!
//! Backends store opaque bytes per fingerprint; serialization, expiry, and
//! corruption handling live in the store layer above. `DiskCache` is the
//! production backend (one file per fingerprint, survives restarts);
//! `MemoryCache` backs tests and cache-disabled operation.

use super::key::Fingerprint;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Distinguishes temp files of concurrent writers to the same fingerprint.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn read(&self, fingerprint: &Fingerprint) -> Result<Option<Vec<u8>>>;
    async fn write(&self, fingerprint: &Fingerprint, data: &[u8]) -> Result<()>;
    async fn remove(&self, fingerprint: &Fingerprint) -> Result<bool>;
    fn name(&self) -> &'static str;
}

/// One JSON file per fingerprint under a cache directory.
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{}.json", fingerprint.as_str()))
    }
}

#[async_trait]
impl CacheBackend for DiskCache {
    async fn read(&self, fingerprint: &Fingerprint) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.entry_path(fingerprint)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::CacheRead(format!(
                "{}: {}",
                fingerprint.as_str(),
                e
            ))),
        }
    }

    async fn write(&self, fingerprint: &Fingerprint, data: &[u8]) -> Result<()> {
        let map_err =
            |e: std::io::Error| Error::CacheWrite(format!("{}: {}", fingerprint.as_str(), e));

        tokio::fs::create_dir_all(&self.dir).await.map_err(map_err)?;

        // Write-then-rename keeps concurrent writers from interleaving bytes;
        // last writer wins with a whole, valid entry. The temp name must be
        // unique per write, or two writers sharing it could mangle each
        // other's bytes before the rename.
        let path = self.entry_path(fingerprint);
        let tmp = self.dir.join(format!(
            "{}.{}.{}.tmp",
            fingerprint.as_str(),
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp, data).await.map_err(map_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(map_err)?;
        Ok(())
    }

    async fn remove(&self, fingerprint: &Fingerprint) -> Result<bool> {
        match tokio::fs::remove_file(self.entry_path(fingerprint)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::CacheWrite(format!(
                "{}: {}",
                fingerprint.as_str(),
                e
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}

/// Process-local backend. Expiry is enforced by the store layer, so this is
/// a plain map.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn read(&self, fingerprint: &Fingerprint) -> Result<Option<Vec<u8>>> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .get(fingerprint.as_str())
            .cloned())
    }

    async fn write(&self, fingerprint: &Fingerprint, data: &[u8]) -> Result<()> {
        self.entries
            .write()
            .unwrap()
            .insert(fingerprint.as_str().to_string(), data.to_vec());
        Ok(())
    }

    async fn remove(&self, fingerprint: &Fingerprint) -> Result<bool> {
        Ok(self
            .entries
            .write()
            .unwrap()
            .remove(fingerprint.as_str())
            .is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

//! Persistence Module
//!
//! Optional on-device backing for the in-memory store. The cache writes
//! through to it and reloads from it at startup; every failure here is
//! swallowed by the `Cache` handle.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::CacheEntry;
use crate::error::Result;

/// Durable key/value storage for cache entries.
#[async_trait]
pub trait Persistence: Send + Sync + Debug {
    /// Loads every stored entry, expired or not.
    async fn load_all(&self) -> Result<Vec<(String, CacheEntry)>>;

    async fn save(&self, key: &str, entry: &CacheEntry) -> Result<()>;

    /// Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

// == File Persistence ==
/// One JSON file per key inside a directory. File names are the hex
/// encoding of the key so any key is a valid name.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    dir: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    key: String,
    #[serde(flatten)]
    entry: CacheEntry,
}

impl FilePersistence {
    /// Creates the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key.bytes().map(|b| format!("{b:02x}")).collect();
        self.dir.join(format!("{name}.json"))
    }
}

fn is_entry_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

#[async_trait]
impl Persistence for FilePersistence {
    async fn load_all(&self) -> Result<Vec<(String, CacheEntry)>> {
        let mut loaded = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;

        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if !is_entry_file(&path) {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<PersistedEntry>(&bytes) {
                Ok(persisted) => loaded.push((persisted.key, persisted.entry)),
                // A torn write leaves garbage; skip it rather than fail the load
                Err(err) => debug!("Skipping unreadable cache file {}: {}", path.display(), err),
            }
        }

        Ok(loaded)
    }

    async fn save(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let persisted = PersistedEntry {
            key: key.to_string(),
            entry: entry.clone(),
        };
        let bytes = serde_json::to_vec(&persisted)?;
        tokio::fs::write(self.path_for(key), bytes).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if is_entry_file(&path) {
                tokio::fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }
}

//! TTL key-value cache for proxied upstream responses
//!
//! Two stores sit behind [`CacheStore`]: an in-process map and an on-disk
//! `fjall` keyspace. Callers hold a [`Cache`] handle, which serializes values
//! to JSON. Concurrent writers race freely; the last write wins.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use fjall::Keyspace;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::task;

use crate::config::CacheConfig;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Raw payload for `key`, or `None` when missing or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

struct MemoryEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-process store; expired entries are dropped when read and on every write
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self
            .entries
            .read()
            .map_err(|_| anyhow!("cache lock poisoned"))?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        {
            let entries = self
                .entries
                .read()
                .map_err(|_| anyhow!("cache lock poisoned"))?;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        tracing::debug!("Key found but expired");
        self.remove(key).await?;
        Ok(None)
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).ok_or(anyhow!("TTL overflow"))?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("cache lock poisoned"))?;
        entries.retain(|_, entry| entry.expires_at > now);
        if expires_at > now {
            entries.insert(key.to_string(), MemoryEntry { value, expires_at });
        } else {
            entries.remove(key);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .write()
            .map_err(|_| anyhow!("cache lock poisoned"))?
            .remove(key);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    payload: Vec<u8>,
    expires_at: u64, // Unix timestamp (seconds)
}

/// On-disk store backed by a `fjall` keyspace
pub struct PersistentStore {
    store: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

impl PersistentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let items = db.keyspace("cache", fjall::KeyspaceCreateOptions::default)?;
        Ok(PersistentStore { store: items })
    }
}

#[async_trait]
impl CacheStore for PersistentStore {
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> =
            task::spawn_blocking(move || get_from_store(store, key_bytes)).await??;

        let Some(bytes) = maybe_bytes else {
            tracing::debug!("Key not found");
            return Ok(None);
        };

        let entry: StoredEntry = postcard::from_bytes(&bytes)?;
        if unix_now()? < entry.expires_at {
            tracing::debug!("Key found and still fresh");
            Ok(Some(entry.payload))
        } else {
            tracing::debug!("Key found but expired");
            self.remove(key).await?;
            Ok(None)
        }
    }

    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let expires_at = SystemTime::now()
            .checked_add(ttl)
            .ok_or(anyhow!("TTL overflow"))?
            .duration_since(UNIX_EPOCH)?
            .as_secs();
        let bytes = postcard::to_stdvec(&StoredEntry {
            payload: value,
            expires_at,
        })?;

        task::spawn_blocking(move || store.insert(key, bytes)).await??;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        task::spawn_blocking(move || store.remove(key)).await??;
        Ok(())
    }
}

/// Shared handle to a cache store; cheap to clone
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn persistent(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Arc::new(PersistentStore::open(path)?)))
    }

    /// Build the store selected by `config.backend`
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        match config.backend.as_str() {
            "memory" => Ok(Self::in_memory()),
            "persistent" => {
                std::fs::create_dir_all(&config.location)?;
                Self::persistent(&config.location)
            }
            other => Err(anyhow!("Unknown cache backend '{other}'")),
        }
    }

    /// Stores a serializable value with a time-to-live (TTL).
    pub async fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.store.put(key, bytes, ttl).await
    }

    /// Retrieves a value if it exists and has not expired.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(key).await
    }
}

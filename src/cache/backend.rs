//! Cache Backend Module
//!
//! The key-value store seam consumed by the read-through cache, plus the
//! in-memory implementation over `CacheStore`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{CacheKey, CacheStore};
use crate::error::{RepoError, Result};

// == Cache Backend ==
/// A shared key-value store with per-entry TTL.
///
/// Each call is expected to be atomic on its own; callers get no atomicity
/// across calls.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn save(&self, key: &CacheKey, value: String, ttl_secs: u64) -> Result<()>;
    async fn contains(&self, key: &CacheKey) -> Result<bool>;
    /// `Ok(None)` when the key is absent or expired.
    async fn fetch(&self, key: &CacheKey) -> Result<Option<String>>;
    /// Deleting an absent key succeeds.
    async fn delete(&self, key: &CacheKey) -> Result<()>;
}

// == Memory Backend ==
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    store: Arc<RwLock<CacheStore>>,
}

impl MemoryBackend {
    pub fn new(store: CacheStore) -> Self {
        Self::from_shared(Arc::new(RwLock::new(store)))
    }

    /// Wraps a store that is also handed to the cleanup task and stats endpoint.
    pub fn from_shared(store: Arc<RwLock<CacheStore>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<RwLock<CacheStore>> {
        self.store.clone()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn save(&self, key: &CacheKey, value: String, ttl_secs: u64) -> Result<()> {
        let mut store = self.store.write().await;
        store.set(key.as_str().to_string(), value, ttl_secs)
    }

    async fn contains(&self, key: &CacheKey) -> Result<bool> {
        let mut store = self.store.write().await;
        Ok(store.contains(key.as_str()))
    }

    async fn fetch(&self, key: &CacheKey) -> Result<Option<String>> {
        // write lock: a hit refreshes recency, a stale entry is dropped
        let mut store = self.store.write().await;
        match store.get(key.as_str()) {
            Ok(value) => Ok(Some(value)),
            Err(RepoError::NotFound(_)) | Err(RepoError::Expired(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        let mut store = self.store.write().await;
        match store.delete(key.as_str()) {
            Ok(()) | Err(RepoError::NotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

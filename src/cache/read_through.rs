//! Read-Through Cache Module
//!
//! Serves query results from a `CacheBackend` when present and populates it
//! from the data source on a miss. Caching is best-effort: backend failures
//! are logged and the caller falls through to the data source.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CacheBackend, CacheKey, CanonicalArg, TtlPolicy};
use crate::error::Result;

// == Read Through Cache ==
#[derive(Clone)]
pub struct ReadThroughCache {
    scope: String,
    backend: Arc<dyn CacheBackend>,
    policy: TtlPolicy,
}

impl std::fmt::Debug for ReadThroughCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadThroughCache")
            .field("scope", &self.scope)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ReadThroughCache {
    /// `scope` namespaces every key, normally the entity name.
    pub fn new(scope: impl Into<String>, backend: Arc<dyn CacheBackend>, policy: TtlPolicy) -> Self {
        Self {
            scope: scope.into(),
            backend,
            policy,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn policy(&self) -> &TtlPolicy {
        &self.policy
    }

    // == Compute Key ==
    pub fn compute_key(&self, method: &str, args: &[&dyn CanonicalArg]) -> CacheKey {
        CacheKey::compute(&self.scope, method, args)
    }

    // == Get ==
    /// Cached value for the call, or `None` on a miss, a backend failure or
    /// a value that no longer decodes as `T`.
    pub async fn get<T: DeserializeOwned>(&self, method: &str, args: &[&dyn CanonicalArg]) -> Option<T> {
        let key = self.compute_key(method, args);
        self.get_by_key(method, &key).await
    }

    async fn get_by_key<T: DeserializeOwned>(&self, method: &str, key: &CacheKey) -> Option<T> {
        let raw = match self.backend.fetch(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(scope = %self.scope, method, key = %key, "cache miss");
                return None;
            }
            Err(err) => {
                warn!(scope = %self.scope, method, key = %key, error = %err, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(scope = %self.scope, method, key = %key, "cache hit");
                Some(value)
            }
            Err(err) => {
                warn!(scope = %self.scope, method, key = %key, error = %err, "cached value undecodable, treating as miss");
                None
            }
        }
    }

    // == Put ==
    /// Stores `value` for the call, overwriting any previous entry.
    ///
    /// `ttl_override` wins over the method's policy lifespan.
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        method: &str,
        args: &[&dyn CanonicalArg],
        value: &T,
        ttl_override: Option<u64>,
    ) {
        let key = self.compute_key(method, args);
        self.put_by_key(method, &key, value, ttl_override).await;
    }

    async fn put_by_key<T: Serialize + ?Sized>(
        &self,
        method: &str,
        key: &CacheKey,
        value: &T,
        ttl_override: Option<u64>,
    ) {
        let ttl = ttl_override.unwrap_or_else(|| self.policy.ttl_for(method));

        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(scope = %self.scope, method, error = %err, "value not serializable, skipping cache write");
                return;
            }
        };

        match self.backend.save(key, encoded, ttl).await {
            Ok(()) => debug!(scope = %self.scope, method, key = %key, ttl, "cache populated"),
            Err(err) => warn!(scope = %self.scope, method, key = %key, error = %err, "cache write failed"),
        }
    }

    // == Invalidate ==
    pub async fn invalidate(&self, method: &str, args: &[&dyn CanonicalArg]) {
        let key = self.compute_key(method, args);
        if let Err(err) = self.backend.delete(&key).await {
            warn!(scope = %self.scope, method, key = %key, error = %err, "cache invalidation failed");
        }
    }

    // == Contains ==
    pub async fn contains(&self, method: &str, args: &[&dyn CanonicalArg]) -> bool {
        let key = self.compute_key(method, args);
        match self.backend.contains(&key).await {
            Ok(present) => present,
            Err(err) => {
                warn!(scope = %self.scope, method, key = %key, error = %err, "cache lookup failed");
                false
            }
        }
    }

    // == Get Or Load ==
    /// Read-through lookup for list-returning queries.
    ///
    /// On a miss `load` runs once; its result is cached only when non-empty.
    /// Errors from `load` propagate unchanged and nothing is cached.
    pub async fn get_or_load<T, F, Fut>(
        &self,
        method: &str,
        args: &[&dyn CanonicalArg],
        load: F,
    ) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<T>>> + Send,
    {
        let key = self.compute_key(method, args);

        if let Some(cached) = self.get_by_key::<Vec<T>>(method, &key).await {
            return Ok(cached);
        }

        let loaded = load().await?;
        if !loaded.is_empty() {
            self.put_by_key(method, &key, &loaded, None).await;
        }

        Ok(loaded)
    }
}

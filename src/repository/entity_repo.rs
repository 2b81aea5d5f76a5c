//! Entity Repository
//!
//! CRUD operations for one entity, with parameterized queries served through
//! the read-through cache.

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::{CacheBackend, ReadThroughCache, TtlPolicy};
use crate::error::{RepoError, Result};
use crate::repository::{DataSource, EntityDescriptor, FetchMode, FilterSpec, Record};

/// Method name under which `get_by_params` results are cached.
pub const GET_BY_PARAMS: &str = "get_by_params";

// == Entity Repository ==
pub struct EntityRepository {
    entity: EntityDescriptor,
    source: Arc<dyn DataSource>,
    cache: ReadThroughCache,
}

impl std::fmt::Debug for EntityRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRepository")
            .field("entity", &self.entity)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl EntityRepository {
    /// Cache keys are scoped by the entity name.
    pub fn new(
        entity: EntityDescriptor,
        source: Arc<dyn DataSource>,
        backend: Arc<dyn CacheBackend>,
        policy: TtlPolicy,
    ) -> Self {
        let cache = ReadThroughCache::new(entity.name(), backend, policy);
        Self {
            entity,
            source,
            cache,
        }
    }

    pub fn entity(&self) -> &EntityDescriptor {
        &self.entity
    }

    pub fn cache(&self) -> &ReadThroughCache {
        &self.cache
    }

    // == Select ==
    /// First record whose columns equal every criterion.
    pub async fn select(&self, criteria: &Record) -> Result<Option<Record>> {
        self.source.find_one(&self.entity, criteria).await
    }

    // == Get By Params ==
    /// Records matching `filter`, or `None` when nothing matches.
    ///
    /// Results are cached per (filter, raw) pair; empty results never are.
    pub async fn get_by_params(&self, filter: &FilterSpec, raw: bool) -> Result<Option<Vec<Record>>> {
        let mode = if raw { FetchMode::Entity } else { FetchMode::Array };

        let rows = self
            .cache
            .get_or_load(GET_BY_PARAMS, &[filter, &raw], || {
                self.source.execute(&self.entity, filter, mode)
            })
            .await?;

        Ok(if rows.is_empty() { None } else { Some(rows) })
    }

    /// Drops the cached result of one `get_by_params` call.
    pub async fn invalidate_get_by_params(&self, filter: &FilterSpec, raw: bool) {
        self.cache.invalidate(GET_BY_PARAMS, &[filter, &raw]).await;
    }

    // == Count ==
    pub async fn get_count(&self) -> Result<u64> {
        self.source.count(&self.entity).await
    }

    // == Create ==
    /// Persists a new record and returns its id, or 0 if none was assigned.
    pub async fn create(&self, mut data: Record) -> Result<i64> {
        data.remove(self.entity.id_column().as_str());
        let id = self.source.persist(&self.entity, data).await?;

        info!(entity = self.entity.name(), id, "record created");
        Ok(id.max(0))
    }

    // == Update ==
    /// Merges `data` into record `id`. `None` when the id is not positive,
    /// `data` is empty, or no such record exists.
    pub async fn update(&self, id: i64, data: &Record) -> Result<Option<i64>> {
        if id <= 0 {
            return Ok(None);
        }
        if data.is_empty() {
            debug!(entity = self.entity.name(), id, "empty update rejected");
            return Ok(None);
        }

        let updated = self.source.merge(&self.entity, id, data).await?;
        if let Some(id) = updated {
            info!(entity = self.entity.name(), id, "record updated");
        }
        Ok(updated)
    }

    // == Delete ==
    pub async fn delete(&self, id: i64) -> Result<bool> {
        if id <= 0 {
            return Ok(false);
        }

        let removed = self.source.remove(&self.entity, id).await?;
        if removed {
            info!(entity = self.entity.name(), id, "record deleted");
        }
        Ok(removed)
    }

    // == Update By Params ==
    /// Applies `data` to every record matching `filter`.
    ///
    /// Returns false for empty `data`, true otherwise, even when nothing
    /// matched. The filter may only hold predicates.
    pub async fn update_by_params(&self, filter: &FilterSpec, data: &Record) -> Result<bool> {
        if data.is_empty() {
            debug!(entity = self.entity.name(), "empty bulk update rejected");
            return Ok(false);
        }
        if data.contains_key(self.entity.id_column().as_str()) {
            return Err(RepoError::InvalidRequest(format!(
                "column {} is the identifier and cannot be bulk updated",
                self.entity.id_column()
            )));
        }
        if !filter.predicates_only() {
            return Err(RepoError::InvalidFilter(
                "bulk updates accept predicates only".to_string(),
            ));
        }

        let changed = self
            .source
            .execute_update(&self.entity, filter, data)
            .await?;
        info!(entity = self.entity.name(), changed, "bulk update applied");
        Ok(true)
    }
}

//! API Handlers
//!
//! HTTP request handlers exposing the entity repository.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::cache::{CacheStore, MemoryBackend};
use crate::config::Config;
use crate::error::{RepoError, Result};
use crate::models::{
    CountResponse, DeleteResponse, HealthResponse, IdResponse, QueryParams, RecordsResponse,
    StatsResponse, UpdateByParamsRequest, UpdatedResponse,
};
use crate::repository::{EntityDescriptor, EntityRepository, FilterSpec, MemoryDataSource, Record};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository for the configured entity
    pub repository: Arc<EntityRepository>,
    /// Cache store behind the repository, shared with the cleanup task
    pub cache: Arc<RwLock<CacheStore>>,
}

impl AppState {
    pub fn new(repository: EntityRepository, cache: Arc<RwLock<CacheStore>>) -> Self {
        Self {
            repository: Arc::new(repository),
            cache,
        }
    }

    /// Wires an in-memory data source and cache store from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = Arc::new(RwLock::new(CacheStore::new(config.max_entries)));
        let entity = EntityDescriptor::new(config.entity_name.as_str())?
            .with_id_column(&config.id_column)?;

        let repository = EntityRepository::new(
            entity,
            Arc::new(MemoryDataSource::new()),
            Arc::new(MemoryBackend::from_shared(cache.clone())),
            config.ttl_policy(),
        );

        Ok(Self::new(repository, cache))
    }
}

/// Handler for POST /{entity}/query
pub async fn query_handler(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
    Json(body): Json<Value>,
) -> Result<Json<RecordsResponse>> {
    let filter = FilterSpec::try_from(&body)?;

    match state.repository.get_by_params(&filter, params.raw).await? {
        Some(records) => Ok(Json(RecordsResponse::new(records))),
        None => Err(RepoError::NotFound(
            "No records match the filter".to_string(),
        )),
    }
}

/// Handler for POST /{entity}/find
pub async fn find_handler(
    State(state): State<AppState>,
    Json(criteria): Json<Record>,
) -> Result<Json<Record>> {
    state
        .repository
        .select(&criteria)
        .await?
        .map(Json)
        .ok_or_else(|| RepoError::NotFound("No record matches the criteria".to_string()))
}

/// Handler for GET /{entity}/count
pub async fn count_handler(State(state): State<AppState>) -> Result<Json<CountResponse>> {
    let count = state.repository.get_count().await?;
    Ok(Json(CountResponse { count }))
}

/// Handler for POST /{entity}/items
pub async fn create_handler(
    State(state): State<AppState>,
    Json(data): Json<Record>,
) -> Result<(StatusCode, Json<IdResponse>)> {
    let id = state.repository.create(data).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

/// Handler for PUT /{entity}/items/:id
pub async fn update_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(data): Json<Record>,
) -> Result<Json<IdResponse>> {
    if data.is_empty() {
        return Err(RepoError::InvalidRequest(
            "Update data cannot be empty".to_string(),
        ));
    }

    match state.repository.update(id, &data).await? {
        Some(id) => Ok(Json(IdResponse { id })),
        None => Err(RepoError::NotFound(format!("Record {} not found", id))),
    }
}

/// Handler for DELETE /{entity}/items/:id
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>> {
    if state.repository.delete(id).await? {
        Ok(Json(DeleteResponse { deleted: true, id }))
    } else {
        Err(RepoError::NotFound(format!("Record {} not found", id)))
    }
}

/// Handler for PATCH /{entity}/items
pub async fn update_by_params_handler(
    State(state): State<AppState>,
    Json(req): Json<UpdateByParamsRequest>,
) -> Result<Json<UpdatedResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(RepoError::InvalidRequest(error_msg));
    }

    let filter = FilterSpec::try_from(&req.filter)?;
    let updated = state.repository.update_by_params(&filter, &req.data).await?;
    Ok(Json(UpdatedResponse { updated }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.read().await.stats();
    Json(StatsResponse::from(stats))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

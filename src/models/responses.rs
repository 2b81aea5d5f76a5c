//! Response DTOs for the repository API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::repository::Record;

/// Response body for `POST /{entity}/query`
#[derive(Debug, Clone, Serialize)]
pub struct RecordsResponse {
    pub count: usize,
    pub records: Vec<Record>,
}

impl RecordsResponse {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            count: records.len(),
            records,
        }
    }
}

/// Response body for create and update
#[derive(Debug, Clone, Serialize)]
pub struct IdResponse {
    pub id: i64,
}

/// Response body for `GET /{entity}/count`
#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Response body for `DELETE /{entity}/items/:id`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: i64,
}

/// Response body for `PATCH /{entity}/items`
#[derive(Debug, Clone, Serialize)]
pub struct UpdatedResponse {
    pub updated: bool,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub total_entries: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

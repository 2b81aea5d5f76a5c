//! API Routes
//!
//! Configures the Axum router for the configured entity plus service endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    count_handler, create_handler, delete_handler, find_handler, health_handler, query_handler,
    stats_handler, update_by_params_handler, update_handler, AppState,
};

/// Creates the main router, with entity routes under `/{entity}`.
///
/// # Endpoints
/// - `POST /{entity}/query` - Cached parameterized query
/// - `POST /{entity}/find` - First record matching exact criteria
/// - `GET /{entity}/count` - Number of records
/// - `POST /{entity}/items` - Create a record
/// - `PATCH /{entity}/items` - Update every record matching a filter
/// - `PUT /{entity}/items/:id` - Update one record
/// - `DELETE /{entity}/items/:id` - Delete one record
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let base = format!("/{}", state.repository.entity().name());

    Router::new()
        .route(&format!("{}/query", base), post(query_handler))
        .route(&format!("{}/find", base), post(find_handler))
        .route(&format!("{}/count", base), get(count_handler))
        .route(
            &format!("{}/items", base),
            post(create_handler).patch(update_by_params_handler),
        )
        .route(
            &format!("{}/items/:id", base),
            put(update_handler).delete(delete_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::catalog;
use crate::api::handlers::catalog::AppState;

/// Create router with application state
pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/schemas", get(catalog::list_schemas))
        .route("/api/schemas/{schema}/tables", get(catalog::list_tables))
        .route("/api/schemas/{schema}/tables/{table}", get(catalog::get_table))
        .route("/api/catalog/refresh", post(catalog::refresh_catalog))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

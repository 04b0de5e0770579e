use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::config::Config;
use crate::models::CatalogSnapshot;
use crate::services::datafusion::DataFusionCatalogRegistrar;
use crate::services::SchemaCache;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<SchemaCache>,
    pub registrar: Arc<DataFusionCatalogRegistrar>,
    pub config: Config,
}

impl AppState {
    /// Make a freshly built snapshot visible to the query engine
    fn publish(&self, snapshot: &CatalogSnapshot) -> Result<(), AppError> {
        self.registrar
            .register(&self.config.catalog.name, snapshot)
            .map_err(AppError::from)
    }
}

fn require_name(kind: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} name cannot be empty", kind)));
    }
    Ok(())
}

/// List schema names
pub async fn list_schemas(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let schemas = state.cache.list_schema_names().await?;

    Ok(Json(serde_json::json!({
        "schemas": schemas
    })))
}

/// List table names of a schema
pub async fn list_tables(
    State(state): State<AppState>,
    Path(schema): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_name("Schema", &schema)?;
    let tables = state.cache.list_table_names(&schema).await?;

    Ok(Json(serde_json::json!({
        "schema": schema.to_lowercase(),
        "tables": tables
    })))
}

/// Get a table with its resolved columns.
/// The whole catalog is refreshed before the lookup.
pub async fn get_table(
    State(state): State<AppState>,
    Path((schema, table)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_name("Schema", &schema)?;
    require_name("Table", &table)?;
    tracing::info!("Getting table {}.{}", schema, table);

    let resolved = state.cache.get_table(&schema, &table).await?;

    if let Some(snapshot) = state.cache.peek().await {
        state.publish(&snapshot)?;
    }

    let resolved = resolved.ok_or_else(|| AppError::NotFound(format!("Table {}.{} not found", schema, table)))?;

    Ok(Json(serde_json::json!({
        "table": resolved.as_ref()
    })))
}

/// Force a full refresh of the catalog
pub async fn refresh_catalog(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("Force refreshing catalog");
    let snapshot = state.cache.refresh().await?;
    state.publish(&snapshot)?;

    Ok(Json(serde_json::json!({
        "generation": snapshot.generation,
        "built_at": snapshot.built_at,
        "schemas": snapshot.schemas.len(),
        "tables": snapshot.table_count(),
        "source_failures": snapshot.source_failures,
    })))
}

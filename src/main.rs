use axum::Router;
use datafusion::prelude::SessionContext;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use es_catalog_backend::api;
use es_catalog_backend::api::handlers::catalog::AppState;
use es_catalog_backend::config::Config;
use es_catalog_backend::services::datafusion::DataFusionCatalogRegistrar;
use es_catalog_backend::services::elasticsearch::ElasticsearchMappingFetcher;
use es_catalog_backend::services::{CatalogLoader, CatalogLocation, SchemaCache, TableColumnMerger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_ansi(config.logging.style != "never")
        .init();

    info!("Catalog document: {}", config.catalog.metadata_uri);

    let location = CatalogLocation::parse(&config.catalog.metadata_uri).map_err(|e| {
        error!("Invalid catalog location: {}", e);
        e
    })?;
    let loader = CatalogLoader::new(location, config.fetch_timeout())?;

    let fetcher = Arc::new(ElasticsearchMappingFetcher::new(config.fetch_timeout()));
    let merger = TableColumnMerger::new(fetcher, config.fetch_timeout(), config.fetch.max_concurrency);
    let cache = Arc::new(SchemaCache::new(loader, merger));
    let registrar = Arc::new(DataFusionCatalogRegistrar::new(SessionContext::new()));

    // Build the first snapshot eagerly; the cache retries on first access if this fails
    match cache.refresh().await {
        Ok(snapshot) => {
            if let Err(e) = registrar.register(&config.catalog.name, &snapshot) {
                warn!("Failed to register catalog with DataFusion: {}", e);
            }
        }
        Err(e) => warn!("Initial catalog load failed: {}", e),
    }

    let state = AppState {
        cache,
        registrar,
        config: config.clone(),
    };

    // Create router with state
    let app: Router = api::routes::create_router_with_state(state);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

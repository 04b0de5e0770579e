use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::error::CatalogResult;
use crate::models::{CatalogSnapshot, SchemaTables, SourceOutcome, Table};
use crate::services::catalog_loader::CatalogLoader;
use crate::services::column_merger::TableColumnMerger;

/// Memoized catalog: schema -> table -> columns.
///
/// The snapshot is built lazily on first access and replaced wholesale by
/// `refresh`. Readers see either the previous snapshot or the new one.
pub struct SchemaCache {
    loader: CatalogLoader,
    merger: TableColumnMerger,
    snapshot: RwLock<Option<Arc<CatalogSnapshot>>>,
    /// Serializes builds so concurrent callers don't fetch twice
    build_lock: Mutex<()>,
    generation: AtomicU64,
}

impl SchemaCache {
    pub fn new(loader: CatalogLoader, merger: TableColumnMerger) -> Self {
        Self {
            loader,
            merger,
            snapshot: RwLock::new(None),
            build_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot currently installed, without triggering a build
    pub async fn peek(&self) -> Option<Arc<CatalogSnapshot>> {
        self.snapshot.read().await.clone()
    }

    /// Current snapshot, built on first use
    pub async fn snapshot(&self) -> CatalogResult<Arc<CatalogSnapshot>> {
        // Fast path
        if let Some(snapshot) = self.peek().await {
            return Ok(snapshot);
        }

        let _guard = self.build_lock.lock().await;

        // Another caller may have built it while we waited
        if let Some(snapshot) = self.peek().await {
            return Ok(snapshot);
        }

        self.rebuild().await
    }

    pub async fn list_schema_names(&self) -> CatalogResult<BTreeSet<String>> {
        Ok(self.snapshot().await?.schema_names().into_iter().collect())
    }

    /// Table names of a schema, empty when the schema is unknown
    pub async fn list_table_names(&self, schema: &str) -> CatalogResult<BTreeSet<String>> {
        Ok(self.snapshot().await?.table_names(schema).into_iter().collect())
    }

    /// Look up a table after re-fetching the remote mappings of the whole catalog.
    ///
    /// Every call pays for a full refresh. If the refresh fails the previous
    /// snapshot is used.
    pub async fn get_table(&self, schema: &str, table: &str) -> CatalogResult<Option<Arc<Table>>> {
        let snapshot = match self.refresh().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Catalog refresh failed, serving previous snapshot: {}", e);
                self.snapshot().await?
            }
        };

        Ok(snapshot.table(schema, table))
    }

    /// Reload the catalog document, resolve every table's columns and install
    /// the result. On failure the installed snapshot is left untouched.
    pub async fn refresh(&self) -> CatalogResult<Arc<CatalogSnapshot>> {
        let _guard = self.build_lock.lock().await;
        self.rebuild().await
    }

    /// Caller must hold `build_lock`
    async fn rebuild(&self) -> CatalogResult<Arc<CatalogSnapshot>> {
        let skeleton = self.loader.load().await?;

        // schemas that declare no tables still exist
        let mut schemas: BTreeMap<String, SchemaTables> = skeleton
            .keys()
            .map(|schema| (schema.clone(), SchemaTables::new()))
            .collect();

        let tables: Vec<(String, Table)> = skeleton
            .into_iter()
            .flat_map(|(schema, tables)| tables.into_values().map(move |table| (schema.clone(), table)))
            .collect();

        let resolved: Vec<_> = stream::iter(tables)
            .map(|(schema, table)| async move {
                let merged = self.merger.merge(&table).await;
                (schema, table, merged)
            })
            .buffer_unordered(self.merger.max_concurrency())
            .collect()
            .await;

        let mut source_failures = Vec::new();

        for (schema, table, merged) in resolved {
            source_failures.extend(merged.failures().cloned());
            let table = table.with_columns(merged.columns);
            schemas
                .entry(schema)
                .or_default()
                .insert(table.name.clone(), Arc::new(table));
        }

        source_failures.sort_by(|a: &SourceOutcome, b: &SourceOutcome| a.table.cmp(&b.table));

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(CatalogSnapshot::new(generation, schemas, source_failures));

        *self.snapshot.write().await = Some(snapshot.clone());

        tracing::info!(
            "Installed catalog generation {} ({} schemas, {} tables, {} failed sources)",
            snapshot.generation,
            snapshot.schemas.len(),
            snapshot.table_count(),
            snapshot.source_failures.len()
        );

        Ok(snapshot)
    }
}

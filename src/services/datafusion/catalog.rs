// DataFusion catalog registration
//
// Exposes a resolved catalog snapshot to DataFusion so the query layer can
// plan against the discovered tables.

use anyhow::{anyhow, Context, Result};
use datafusion::catalog::{CatalogProvider, MemoryCatalogProvider, MemorySchemaProvider, SchemaProvider};
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use std::sync::Arc;

use crate::models::{CatalogSnapshot, Table};

/// Registers catalog snapshots with a DataFusion session
///
/// # Architecture
/// ```text
/// SessionContext
///   └── Catalog (e.g., "elasticsearch")
///       └── Schema (one per catalog document schema)
///           └── Tables (columns resolved from the field mappings)
/// ```
pub struct DataFusionCatalogRegistrar {
    ctx: SessionContext,
}

impl DataFusionCatalogRegistrar {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Register every schema and table of the snapshot under `catalog_name`.
    ///
    /// Registering again under the same name replaces the previous catalog.
    ///
    /// # Example
    /// ```rust,ignore
    /// let snapshot = schema_cache.refresh().await?;
    /// registrar.register("elasticsearch", &snapshot)?;
    ///
    /// // Now can plan: SELECT message FROM elasticsearch.logs.events
    /// ```
    pub fn register(&self, catalog_name: &str, snapshot: &CatalogSnapshot) -> Result<()> {
        let catalog = Arc::new(MemoryCatalogProvider::new());

        for (schema_name, tables) in &snapshot.schemas {
            let schema = Arc::new(MemorySchemaProvider::new());
            for table in tables.values() {
                Self::register_table(schema.as_ref(), table)
                    .with_context(|| format!("Failed to register table {}.{}", schema_name, table.name))?;
            }
            catalog
                .register_schema(schema_name, schema)
                .with_context(|| format!("Failed to register schema {}", schema_name))?;
        }

        self.ctx.register_catalog(catalog_name, catalog);

        tracing::info!(
            "Registered catalog {} (generation {}) with DataFusion",
            catalog_name,
            snapshot.generation
        );
        Ok(())
    }

    fn register_table(schema: &MemorySchemaProvider, table: &Table) -> Result<()> {
        // Data is read elsewhere; the table only carries the resolved schema
        let mem_table = MemTable::try_new(Arc::new(table.arrow_schema()), vec![vec![]])?;
        schema.register_table(table.name.clone(), Arc::new(mem_table))?;
        Ok(())
    }

    pub fn session_context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Tables registered under a catalog schema
    pub fn list_tables(&self, catalog_name: &str, schema_name: &str) -> Result<Vec<String>> {
        let catalog = self
            .ctx
            .catalog(catalog_name)
            .ok_or_else(|| anyhow!("Catalog '{}' not found", catalog_name))?;

        let schema = catalog
            .schema(schema_name)
            .ok_or_else(|| anyhow!("Schema '{}' not found", schema_name))?;

        let mut tables = schema.table_names();
        tables.sort();
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, RelationalType, SchemaTables};
    use datafusion::arrow::datatypes::DataType;
    use std::collections::BTreeMap;

    fn create_test_snapshot() -> CatalogSnapshot {
        let events = Table::new("events", vec![]).with_columns(vec![
            Column::new("hits", RelationalType::BigInt, "long"),
            Column::new("user.name", RelationalType::Varchar, "string"),
            Column::new("latency", RelationalType::Double, "float"),
        ]);
        let empty = Table::new("unresolved", vec![]);

        let mut tables = SchemaTables::new();
        tables.insert(events.name.clone(), Arc::new(events));
        tables.insert(empty.name.clone(), Arc::new(empty));

        let mut schemas = BTreeMap::new();
        schemas.insert("logs".to_string(), tables);
        CatalogSnapshot::new(1, schemas, vec![])
    }

    #[tokio::test]
    async fn test_register_snapshot() {
        let registrar = DataFusionCatalogRegistrar::new(SessionContext::new());
        registrar.register("es", &create_test_snapshot()).unwrap();

        let tables = registrar.list_tables("es", "logs").unwrap();
        assert_eq!(tables, vec!["events", "unresolved"]);
        assert!(registrar.list_tables("es", "missing").is_err());
        assert!(registrar.list_tables("missing", "logs").is_err());
    }

    #[tokio::test]
    async fn test_registered_schema_is_queryable() {
        let registrar = DataFusionCatalogRegistrar::new(SessionContext::new());
        registrar.register("es", &create_test_snapshot()).unwrap();

        let df = registrar
            .session_context()
            .sql("SELECT hits, user_name, latency FROM es.logs.events")
            .await
            .unwrap();

        let schema = df.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(2).data_type(), &DataType::Float64);

        let batches = df.collect().await.unwrap();
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 0);
    }

    #[tokio::test]
    async fn test_table_with_drifting_mappings_is_queryable() {
        // the same field mapped differently in two indices
        let events = Table::new("events", vec![]).with_columns(vec![
            Column::new("x", RelationalType::BigInt, "integer"),
            Column::new("x", RelationalType::BigInt, "long"),
            Column::new("y", RelationalType::Double, "float"),
            Column::new("y", RelationalType::Varchar, "string"),
        ]);
        let mut tables = SchemaTables::new();
        tables.insert(events.name.clone(), Arc::new(events));
        let mut schemas = BTreeMap::new();
        schemas.insert("logs".to_string(), tables);

        let registrar = DataFusionCatalogRegistrar::new(SessionContext::new());
        registrar.register("es", &CatalogSnapshot::new(1, schemas, vec![])).unwrap();

        let df = registrar
            .session_context()
            .sql("SELECT * FROM es.logs.events")
            .await
            .unwrap();

        let schema = df.schema();
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert_eq!(schema.field(1).data_type(), &DataType::Float64);

        let batches = df.collect().await.unwrap();
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 0);
    }
}

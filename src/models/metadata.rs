use chrono::{DateTime, Utc};
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::source::{SourceOutcome, TableSource};

/// Relational type a remote field is coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationalType {
    /// 64-bit integer
    BigInt,
    /// Double-precision floating point
    Double,
    /// Variable-length text
    Varchar,
}

impl RelationalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationalType::BigInt => "bigint",
            RelationalType::Double => "double",
            RelationalType::Varchar => "varchar",
        }
    }

    /// Arrow type used when the column is registered with the query layer
    pub fn to_arrow(&self) -> DataType {
        match self {
            RelationalType::BigInt => DataType::Int64,
            RelationalType::Double => DataType::Float64,
            RelationalType::Varchar => DataType::Utf8,
        }
    }
}

impl fmt::Display for RelationalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved column.
///
/// Columns are compared on the whole tuple, so the same field observed through
/// two sources collapses to a single entry in a table's column set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Column {
    /// Display name, the field path with `.` replaced by `_`
    pub name: String,
    pub data_type: RelationalType,
    /// Dotted path addressing the field inside a remote document
    pub field_path: String,
    /// Native type name reported by the search engine
    pub remote_type: String,
}

impl Column {
    pub fn new(field_path: impl Into<String>, data_type: RelationalType, remote_type: impl Into<String>) -> Self {
        let field_path = field_path.into();
        Self {
            name: field_path.replace('.', "_"),
            data_type,
            field_path,
            remote_type: remote_type.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub id: Uuid,
    pub name: String,
    pub sources: Vec<TableSource>,
    pub columns: Vec<Column>,
}

impl Table {
    /// Build a table with a fresh identity and no columns.
    /// Columns are always derived from the remote mappings, never carried over.
    pub fn new(name: &str, sources: Vec<TableSource>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_lowercase(),
            sources,
            columns: Vec::new(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    /// One nullable field per column name.
    ///
    /// The same field can be mapped differently across indices, which yields
    /// several columns sharing a name. The first one in column order is kept.
    pub fn arrow_schema(&self) -> Schema {
        let mut kept: BTreeMap<&str, &Column> = BTreeMap::new();
        let mut fields = Vec::with_capacity(self.columns.len());

        for column in &self.columns {
            if let Some(first) = kept.get(column.name.as_str()) {
                if first.data_type != column.data_type {
                    tracing::warn!(
                        "Column {}.{} is mapped as both {} ({}) and {} ({}), keeping {}",
                        self.name,
                        column.name,
                        first.data_type,
                        first.remote_type,
                        column.data_type,
                        column.remote_type,
                        first.data_type
                    );
                }
                continue;
            }
            kept.insert(column.name.as_str(), column);
            fields.push(Field::new(&column.name, column.data_type.to_arrow(), true));
        }

        Schema::new(fields)
    }
}

/// Tables of one schema, keyed by lower-cased table name
pub type SchemaTables = BTreeMap<String, Arc<Table>>;

/// Immutable view of the whole catalog at one point in time
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    pub schemas: BTreeMap<String, SchemaTables>,
    /// Sources that contributed no columns during this build
    pub source_failures: Vec<SourceOutcome>,
}

impl CatalogSnapshot {
    pub fn new(generation: u64, schemas: BTreeMap<String, SchemaTables>, source_failures: Vec<SourceOutcome>) -> Self {
        Self {
            generation,
            built_at: Utc::now(),
            schemas,
            source_failures,
        }
    }

    pub fn schema_names(&self) -> Vec<String> {
        self.schemas.keys().cloned().collect()
    }

    pub fn table_names(&self, schema: &str) -> Vec<String> {
        self.schemas
            .get(&schema.to_lowercase())
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Case-insensitive lookup
    pub fn table(&self, schema: &str, table: &str) -> Option<Arc<Table>> {
        self.schemas
            .get(&schema.to_lowercase())?
            .get(&table.to_lowercase())
            .cloned()
    }

    pub fn table_count(&self) -> usize {
        self.schemas.values().map(|t| t.len()).sum()
    }
}

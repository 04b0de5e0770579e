use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::CatalogError;

/// One physical binding of a table to the search engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableSource {
    #[serde(rename = "hostAddress", alias = "hostaddress")]
    pub host_address: String,
    pub port: u16,
    #[serde(rename = "clusterName")]
    pub cluster_name: String,
    /// No index means every index hosting the document type
    #[serde(default)]
    pub index: Option<String>,
    #[serde(rename = "documentType", alias = "type")]
    pub document_type: String,
}

impl TableSource {
    /// Index the mapping request is scoped to, if any
    pub fn index_scope(&self) -> Option<&str> {
        self.index.as_deref().filter(|i| !i.is_empty())
    }
}

impl fmt::Display for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} [{}] {}/{}",
            self.host_address,
            self.port,
            self.cluster_name,
            self.index_scope().unwrap_or("*"),
            self.document_type
        )
    }
}

/// Table entry as declared in the catalog document
#[derive(Debug, Clone, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<TableSource>,
}

/// Catalog document: schema name -> declared tables
pub type CatalogDocument = BTreeMap<String, Vec<TableDescriptor>>;

/// What happened to one source while resolving a table's columns
#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub table: String,
    pub source: TableSource,
    pub status: SourceStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SourceStatus {
    Resolved { columns: usize },
    Failed { error: CatalogError },
}

impl SourceOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, SourceStatus::Failed { .. })
    }
}

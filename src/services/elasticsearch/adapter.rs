// Mapping fetcher trait, the seam between catalog resolution and the search engine
use crate::error::CatalogResult;
use crate::models::TableSource;
use serde_json::Value;
use std::collections::BTreeMap;

/// Raw mapping of one document type inside one index
#[derive(Debug, Clone, PartialEq)]
pub struct MappingMetadata {
    source: Value,
}

impl MappingMetadata {
    /// Wrap a type definition, re-rooting it under its document type name
    pub fn new(document_type: &str, definition: Value) -> Self {
        let mut root = serde_json::Map::new();
        root.insert(document_type.to_string(), definition);
        Self {
            source: Value::Object(root),
        }
    }

    /// Mapping source rooted at the document type: `{ "<type>": { "properties": ... } }`
    pub fn source(&self) -> &Value {
        &self.source
    }
}

/// index name -> document type -> mapping
pub type IndexMappings = BTreeMap<String, BTreeMap<String, MappingMetadata>>;

/// Retrieves field mappings for one table source
#[async_trait::async_trait]
pub trait MappingFetcher: Send + Sync {
    /// Fetch the mappings of the source's document type, across its index
    /// or across every index hosting the type when no index is configured
    async fn get_mappings(&self, source: &TableSource) -> CatalogResult<IndexMappings>;
}

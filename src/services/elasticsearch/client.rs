// Elasticsearch mapping fetcher using the HTTP REST API
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

use crate::error::{CatalogError, CatalogResult};
use crate::models::TableSource;
use crate::services::elasticsearch::adapter::{IndexMappings, MappingFetcher, MappingMetadata};

pub struct ElasticsearchMappingFetcher {
    request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ClusterInfo {
    cluster_name: String,
}

#[derive(Debug, Deserialize)]
struct IndexMappingsResponse {
    mappings: Option<BTreeMap<String, Value>>,
}

impl ElasticsearchMappingFetcher {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    /// Open a connection scoped to one fetch
    fn connect(&self, source: &TableSource) -> CatalogResult<SourceConnection> {
        let base_url = if source.host_address.starts_with("http://") || source.host_address.starts_with("https://") {
            Url::parse(&source.host_address)
        } else {
            Url::parse(&format!("http://{}:{}/", source.host_address, source.port))
        }
        .map_err(|e| CatalogError::SourceUnavailable(format!("Invalid address for {}: {}", source, e)))?;

        let client = Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| CatalogError::SourceUnavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(SourceConnection { base_url, client })
    }
}

impl Default for ElasticsearchMappingFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait::async_trait]
impl MappingFetcher for ElasticsearchMappingFetcher {
    async fn get_mappings(&self, source: &TableSource) -> CatalogResult<IndexMappings> {
        tracing::info!("Fetching mappings from {}", source);

        // released when it goes out of scope, whatever the outcome
        let connection = self.connect(source)?;
        connection.verify_cluster(&source.cluster_name).await?;
        connection.get_mappings(source).await
    }
}

/// HTTP connection to one node of a cluster
struct SourceConnection {
    base_url: Url,
    client: Client,
}

impl SourceConnection {
    fn endpoint(&self, segments: &[&str]) -> CatalogResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::SourceUnavailable(format!("Invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> CatalogResult<T> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| CatalogError::SourceUnavailable(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CatalogError::SourceUnavailable(format!(
                "Request to {} failed ({}): {}",
                url, status, error_body
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CatalogError::MalformedMapping(format!("Failed to parse response from {}: {}", url, e)))
    }

    /// The node must belong to the cluster the source is bound to
    async fn verify_cluster(&self, expected: &str) -> CatalogResult<()> {
        let url = self.endpoint(&[])?;
        let info: ClusterInfo = self
            .get_json(url)
            .await
            .map_err(|e| CatalogError::SourceUnavailable(format!("Cluster check failed: {}", e)))?;

        if info.cluster_name != expected {
            return Err(CatalogError::SourceUnavailable(format!(
                "Node at {} belongs to cluster '{}', expected '{}'",
                self.base_url, info.cluster_name, expected
            )));
        }

        Ok(())
    }

    async fn get_mappings(&self, source: &TableSource) -> CatalogResult<IndexMappings> {
        let url = match source.index_scope() {
            Some(index) => self.endpoint(&[index, "_mapping", source.document_type.as_str()])?,
            None => self.endpoint(&["_mapping", source.document_type.as_str()])?,
        };

        let response: BTreeMap<String, IndexMappingsResponse> = self.get_json(url).await?;

        let mut mappings = IndexMappings::new();
        for (index, entry) in response {
            let types = entry.mappings.ok_or_else(|| {
                CatalogError::MalformedMapping(format!("Index '{}' has no 'mappings' object", index))
            })?;

            let by_type = types
                .into_iter()
                .map(|(document_type, definition)| {
                    let metadata = MappingMetadata::new(&document_type, definition);
                    (document_type, metadata)
                })
                .collect();
            mappings.insert(index, by_type);
        }

        tracing::debug!("Fetched mappings for {} indices from {}", mappings.len(), source);
        Ok(mappings)
    }
}

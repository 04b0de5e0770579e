use reqwest::Client;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{CatalogDocument, Table};

/// Tables of every schema, before columns are resolved
pub type CatalogSkeleton = BTreeMap<String, BTreeMap<String, Table>>;

/// Where the catalog document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLocation {
    File(PathBuf),
    Http(Url),
}

impl CatalogLocation {
    /// Accepts `file://` and `http(s)://` URLs, anything else is a filesystem path
    pub fn parse(location: &str) -> CatalogResult<Self> {
        match Url::parse(location) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(CatalogLocation::File)
                .map_err(|_| CatalogError::CatalogLoad(format!("Invalid file URL: {}", location))),
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(CatalogLocation::Http(url)),
            Ok(url) if url.scheme().len() > 1 => Err(CatalogError::CatalogLoad(format!(
                "Unsupported catalog URI scheme '{}'",
                url.scheme()
            ))),
            // relative paths, and drive letters parsed as a one-letter scheme
            _ => Ok(CatalogLocation::File(PathBuf::from(location))),
        }
    }
}

impl fmt::Display for CatalogLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogLocation::File(path) => write!(f, "{}", path.display()),
            CatalogLocation::Http(url) => write!(f, "{}", url),
        }
    }
}

/// Loads the declarative catalog document into a table skeleton
pub struct CatalogLoader {
    location: CatalogLocation,
    client: Client,
}

impl CatalogLoader {
    pub fn new(location: CatalogLocation, request_timeout: Duration) -> CatalogResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| CatalogError::CatalogLoad(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { location, client })
    }

    pub fn location(&self) -> &CatalogLocation {
        &self.location
    }

    /// Read and parse the catalog document. Any failure is fatal for the whole catalog.
    pub async fn load(&self) -> CatalogResult<CatalogSkeleton> {
        tracing::info!("Loading catalog from {}", self.location);
        let text = self.read_document().await?;
        let skeleton = parse_catalog(&text)?;

        tracing::info!(
            "Catalog declares {} schemas and {} tables",
            skeleton.len(),
            skeleton.values().map(|t| t.len()).sum::<usize>()
        );
        Ok(skeleton)
    }

    async fn read_document(&self) -> CatalogResult<String> {
        match &self.location {
            CatalogLocation::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                CatalogError::CatalogLoad(format!("Failed to read {}: {}", path.display(), e))
            }),
            CatalogLocation::Http(url) => {
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(|e| CatalogError::CatalogLoad(format!("Failed to fetch {}: {}", url, e)))?;

                if !response.status().is_success() {
                    return Err(CatalogError::CatalogLoad(format!(
                        "Failed to fetch {}: HTTP {}",
                        url,
                        response.status()
                    )));
                }

                response
                    .text()
                    .await
                    .map_err(|e| CatalogError::CatalogLoad(format!("Failed to read body of {}: {}", url, e)))
            }
        }
    }
}

/// Parse a catalog document into schemas of fresh, column-less tables.
///
/// Names are lower-cased. When two tables of a schema share a name the first
/// one is kept; schema keys that collide after lower-casing are merged.
pub fn parse_catalog(text: &str) -> CatalogResult<CatalogSkeleton> {
    let document: CatalogDocument = serde_json::from_str(text)
        .map_err(|e| CatalogError::CatalogLoad(format!("Failed to parse catalog document: {}", e)))?;

    let mut schemas = CatalogSkeleton::new();
    for (schema_name, descriptors) in document {
        let schema_key = schema_name.to_lowercase();
        let tables = schemas.entry(schema_key.clone()).or_default();

        for descriptor in descriptors {
            if descriptor.name.trim().is_empty() {
                return Err(CatalogError::CatalogLoad(format!(
                    "Schema '{}' declares a table without a name",
                    schema_name
                )));
            }
            if descriptor.sources.is_empty() {
                return Err(CatalogError::CatalogLoad(format!(
                    "Table '{}.{}' declares no sources",
                    schema_name, descriptor.name
                )));
            }

            let table = Table::new(&descriptor.name, descriptor.sources);
            if tables.contains_key(&table.name) {
                tracing::debug!("Dropping duplicate table {}.{}", schema_key, table.name);
                continue;
            }
            tables.insert(table.name.clone(), table);
        }
    }

    Ok(schemas)
}

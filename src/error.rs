use serde::Serialize;
use thiserror::Error;

/// Catalog resolution errors.
///
/// Only `CatalogLoad` aborts an operation. The other variants are recorded
/// against the source that produced them and resolution carries on.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum CatalogError {
    #[error("Catalog load error: {0}")]
    CatalogLoad(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Malformed mapping: {0}")]
    MalformedMapping(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

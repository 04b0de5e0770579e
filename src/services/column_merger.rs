use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{Column, SourceOutcome, SourceStatus, Table, TableSource};
use crate::services::elasticsearch::MappingFetcher;
use crate::services::mapping::resolve_columns;

/// Columns of one table merged across its sources
#[derive(Debug, Clone)]
pub struct MergedColumns {
    pub columns: Vec<Column>,
    /// One entry per source, in declaration order
    pub outcomes: Vec<SourceOutcome>,
}

impl MergedColumns {
    pub fn failures(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }
}

/// Resolves a table's columns as the union of the columns of all its sources.
///
/// A source that cannot be fetched or resolved is logged and contributes
/// nothing; the other sources are unaffected. In-flight fetches are capped at
/// `max_concurrency` across every table merged through the same merger.
pub struct TableColumnMerger {
    fetcher: Arc<dyn MappingFetcher>,
    fetch_timeout: Duration,
    max_concurrency: usize,
    permits: Semaphore,
}

impl TableColumnMerger {
    pub fn new(fetcher: Arc<dyn MappingFetcher>, fetch_timeout: Duration, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            fetcher,
            fetch_timeout,
            max_concurrency,
            permits: Semaphore::new(max_concurrency),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Columns declared by the source's document type, across every index returned
    pub async fn source_columns(&self, source: &TableSource) -> CatalogResult<BTreeSet<Column>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| CatalogError::SourceUnavailable(format!("Fetch of {} cancelled: {}", source, e)))?;

        let mappings = tokio::time::timeout(self.fetch_timeout, self.fetcher.get_mappings(source))
            .await
            .map_err(|_| {
                CatalogError::SourceUnavailable(format!(
                    "Mapping fetch from {} timed out after {:?}",
                    source, self.fetch_timeout
                ))
            })??;
        drop(permit);

        let mut columns = BTreeSet::new();
        for (index, types) in &mappings {
            let Some(metadata) = types.get(&source.document_type) else {
                tracing::debug!("Index {} has no mapping for type {}", index, source.document_type);
                continue;
            };
            columns.extend(resolve_columns(&source.document_type, metadata.source())?);
        }

        Ok(columns)
    }

    pub async fn merge(&self, table: &Table) -> MergedColumns {
        let results: Vec<(TableSource, CatalogResult<BTreeSet<Column>>)> = stream::iter(table.sources.clone())
            .map(|source| async move {
                let result = self.source_columns(&source).await;
                (source, result)
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut columns = BTreeSet::new();
        let mut outcomes = Vec::with_capacity(results.len());

        for (source, result) in results {
            let status = match result {
                Ok(source_columns) => {
                    let count = source_columns.len();
                    columns.extend(source_columns);
                    SourceStatus::Resolved { columns: count }
                }
                Err(error) => {
                    tracing::warn!("Skipping source {} of table {}: {}", source, table.name, error);
                    SourceStatus::Failed { error }
                }
            };
            outcomes.push(SourceOutcome {
                table: table.name.clone(),
                source,
                status,
            });
        }

        tracing::debug!("Table {} resolved to {} columns", table.name, columns.len());

        MergedColumns {
            columns: columns.into_iter().collect(),
            outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RelationalType;
    use crate::services::elasticsearch::adapter::stub::StubMappingFetcher;
    use serde_json::json;

    fn source(host: &str, index: Option<&str>) -> TableSource {
        TableSource {
            host_address: host.to_string(),
            port: 9200,
            cluster_name: "test".to_string(),
            index: index.map(str::to_string),
            document_type: "event".to_string(),
        }
    }

    fn merger(fetcher: Arc<StubMappingFetcher>) -> TableColumnMerger {
        TableColumnMerger::new(fetcher, Duration::from_secs(5), 4)
    }

    fn names(merged: &MergedColumns) -> Vec<String> {
        merged.columns.iter().map(|c| c.name.clone()).collect()
    }

    #[tokio::test]
    async fn test_union_without_duplicates() {
        let fetcher = Arc::new(StubMappingFetcher::new());
        fetcher.set_mapping("a", "logs", "event", json!({ "x": { "type": "integer" } }));
        fetcher.set_mapping(
            "b",
            "logs",
            "event",
            json!({ "x": { "type": "integer" }, "y": { "type": "string" } }),
        );

        let table = Table::new("events", vec![source("a", None), source("b", None)]);
        let merged = merger(fetcher).merge(&table).await;

        assert_eq!(
            merged.columns,
            vec![
                Column::new("x", RelationalType::BigInt, "integer"),
                Column::new("y", RelationalType::Varchar, "string"),
            ]
        );
        assert_eq!(merged.failures().count(), 0);
    }

    #[tokio::test]
    async fn test_union_across_indices_of_one_source() {
        let fetcher = Arc::new(StubMappingFetcher::new());
        fetcher.set_mapping("a", "logs-1", "event", json!({ "x": { "type": "long" } }));
        fetcher.set_mapping("a", "logs-2", "event", json!({ "z": { "type": "double" } }));

        let merger = merger(fetcher);
        let all = merger.source_columns(&source("a", None)).await.unwrap();
        assert_eq!(all.len(), 2);

        let scoped = merger.source_columns(&source("a", Some("logs-2"))).await.unwrap();
        assert_eq!(scoped.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_source_contributes_nothing() {
        let fetcher = Arc::new(StubMappingFetcher::new());
        fetcher.set_mapping("one", "logs", "event", json!({ "x": { "type": "integer" } }));
        fetcher.set_failure("two", CatalogError::SourceUnavailable("connection refused".to_string()));
        fetcher.set_mapping("three", "logs", "event", json!({ "z": { "type": "float" } }));

        let table = Table::new(
            "events",
            vec![source("one", None), source("two", None), source("three", None)],
        );
        let merged = merger(fetcher).merge(&table).await;

        assert_eq!(names(&merged), vec!["x", "z"]);
        let failed: Vec<&str> = merged
            .failures()
            .map(|o| o.source.host_address.as_str())
            .collect();
        assert_eq!(failed, vec!["two"]);
        assert!(matches!(merged.outcomes[0].status, SourceStatus::Resolved { columns: 1 }));
    }

    #[tokio::test]
    async fn test_malformed_mapping_is_a_source_failure() {
        let fetcher = Arc::new(StubMappingFetcher::new());
        fetcher.set_mapping("a", "logs", "event", json!({ "x": { "type": "integer" } }));
        fetcher.set_mapping("b", "logs", "event", json!("not an object"));

        let table = Table::new("events", vec![source("a", None), source("b", None)]);
        let merged = merger(fetcher).merge(&table).await;

        assert_eq!(names(&merged), vec!["x"]);
        assert!(matches!(
            merged.outcomes[1].status,
            SourceStatus::Failed { error: CatalogError::MalformedMapping(_) }
        ));
    }

    #[tokio::test]
    async fn test_all_sources_failing_leaves_empty_columns() {
        let fetcher = Arc::new(StubMappingFetcher::new());
        let table = Table::new("events", vec![source("nowhere", None)]);
        let merged = merger(fetcher).merge(&table).await;

        assert!(merged.columns.is_empty());
        assert_eq!(merged.failures().count(), 1);
    }

    struct HangingFetcher;

    #[async_trait::async_trait]
    impl MappingFetcher for HangingFetcher {
        async fn get_mappings(&self, source: &TableSource) -> CatalogResult<crate::services::elasticsearch::IndexMappings> {
            if source.host_address == "slow" {
                futures::future::pending::<()>().await;
            }
            let mut mappings = crate::services::elasticsearch::IndexMappings::new();
            mappings.entry("logs".to_string()).or_default().insert(
                "event".to_string(),
                crate::services::elasticsearch::MappingMetadata::new(
                    "event",
                    json!({ "properties": { "x": { "type": "long" } } }),
                ),
            );
            Ok(mappings)
        }
    }

    #[tokio::test]
    async fn test_timeout_only_affects_slow_source() {
        let merger = TableColumnMerger::new(Arc::new(HangingFetcher), Duration::from_millis(100), 2);
        let table = Table::new("events", vec![source("slow", None), source("fast", None)]);

        let merged = merger.merge(&table).await;

        assert_eq!(names(&merged), vec!["x"]);
        assert!(matches!(
            merged.outcomes[0].status,
            SourceStatus::Failed { error: CatalogError::SourceUnavailable(_) }
        ));
    }

    struct TrackingFetcher {
        in_flight: std::sync::atomic::AtomicUsize,
        peak: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MappingFetcher for TrackingFetcher {
        async fn get_mappings(&self, _source: &TableSource) -> CatalogResult<crate::services::elasticsearch::IndexMappings> {
            use std::sync::atomic::Ordering;

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(crate::services::elasticsearch::IndexMappings::new())
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_across_tables() {
        let fetcher = Arc::new(TrackingFetcher {
            in_flight: std::sync::atomic::AtomicUsize::new(0),
            peak: std::sync::atomic::AtomicUsize::new(0),
        });
        let merger = TableColumnMerger::new(fetcher.clone(), Duration::from_secs(5), 2);

        let sources = |prefix: &str| -> Vec<TableSource> {
            (0..4).map(|i| source(&format!("{}{}", prefix, i), None)).collect()
        };
        let first = Table::new("first", sources("a"));
        let second = Table::new("second", sources("b"));

        let (a, b) = tokio::join!(merger.merge(&first), merger.merge(&second));

        assert_eq!(a.outcomes.len() + b.outcomes.len(), 8);
        assert_eq!(a.failures().count() + b.failures().count(), 0);
        assert!(fetcher.peak.load(std::sync::atomic::Ordering::SeqCst) <= 2);
    }
}

use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{CatalogError, CatalogResult};
use crate::models::Column;
use crate::services::mapping::{flatten_mapping, map_remote_type};

const TYPE_SUFFIX: &str = ".type";
const NESTED_PROPERTIES: &str = ".properties.";

/// Why a leaf descriptor did not become a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRejection {
    /// Descriptor is not exactly `path:value`
    Malformed(String),
    /// Leaf is some other field property (index, analyzer, ...)
    MissingTypeInfo(String),
    /// Field sits inside an object mapping that was not unwrapped
    ComplexPath(String),
    UnsupportedType { path: String, remote_type: String },
}

impl fmt::Display for ColumnRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRejection::Malformed(d) => write!(f, "invalid column path format '{}'", d),
            ColumnRejection::MissingTypeInfo(p) => write!(f, "'{}' has no type info", p),
            ColumnRejection::ComplexPath(p) => write!(f, "complex column '{}'", p),
            ColumnRejection::UnsupportedType { path, remote_type } => {
                write!(f, "unsupported type '{}' for '{}'", remote_type, path)
            }
        }
    }
}

/// Turn a single `path:value` leaf descriptor into a column
pub fn resolve_column(descriptor: &str) -> Result<Column, ColumnRejection> {
    let parts: Vec<&str> = descriptor.split(':').collect();
    let [path, remote_type] = parts.as_slice() else {
        return Err(ColumnRejection::Malformed(descriptor.to_string()));
    };

    let Some(field_path) = path.strip_suffix(TYPE_SUFFIX) else {
        return Err(ColumnRejection::MissingTypeInfo(path.to_string()));
    };

    if path.contains(NESTED_PROPERTIES) {
        return Err(ColumnRejection::ComplexPath(path.to_string()));
    }

    let data_type = map_remote_type(remote_type).ok_or_else(|| ColumnRejection::UnsupportedType {
        path: path.to_string(),
        remote_type: remote_type.to_string(),
    })?;

    Ok(Column::new(field_path, data_type, *remote_type))
}

/// Resolve the columns declared by one mapping source.
///
/// `mapping_source` is rooted at the document type, i.e.
/// `{ "<document_type>": { "properties": { ... } } }`.
pub fn resolve_columns(document_type: &str, mapping_source: &Value) -> CatalogResult<BTreeSet<Column>> {
    let properties = mapping_source
        .get(document_type)
        .and_then(|definition| definition.get("properties"))
        .and_then(Value::as_object)
        .ok_or_else(|| {
            CatalogError::MalformedMapping(format!(
                "mapping for '{}' has no '{}.properties' object",
                document_type, document_type
            ))
        })?;

    let mut columns = BTreeSet::new();
    for descriptor in flatten_mapping(properties) {
        match resolve_column(&descriptor) {
            Ok(column) => {
                columns.insert(column);
            }
            Err(rejection @ ColumnRejection::UnsupportedType { .. }) => {
                tracing::warn!("Ignoring column: {}", rejection);
            }
            Err(rejection) => {
                tracing::debug!("Ignoring leaf: {}", rejection);
            }
        }
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RelationalType;
    use serde_json::json;

    #[test]
    fn test_integer_field() {
        let column = resolve_column("a.b.type:integer").unwrap();
        assert_eq!(column.field_path, "a.b");
        assert_eq!(column.name, "a_b");
        assert_eq!(column.data_type, RelationalType::BigInt);
        assert_eq!(column.remote_type, "integer");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            resolve_column("a.properties.b.type:string"),
            Err(ColumnRejection::ComplexPath("a.properties.b.type".to_string()))
        );
        assert!(matches!(
            resolve_column("a.type:geo_point"),
            Err(ColumnRejection::UnsupportedType { .. })
        ));
        assert!(matches!(resolve_column("a.type"), Err(ColumnRejection::Malformed(_))));
        assert!(matches!(resolve_column("a.type:x:y"), Err(ColumnRejection::Malformed(_))));
        assert!(matches!(
            resolve_column("a.index:not_analyzed"),
            Err(ColumnRejection::MissingTypeInfo(_))
        ));
        // a top-level property literally named "type" has no parent field
        assert!(matches!(resolve_column("type:string"), Err(ColumnRejection::MissingTypeInfo(_))));
    }

    #[test]
    fn test_resolve_columns_from_mapping() {
        let source = json!({
            "event": {
                "properties": {
                    "count": { "type": "long" },
                    "score": { "type": "float" },
                    "message": { "type": "string", "index": "analyzed" },
                    "location": { "type": "geo_point" },
                    "user": {
                        "properties": {
                            "name": { "type": "string" }
                        }
                    },
                    "tags": [ "ignored" ]
                }
            }
        });

        let columns = resolve_columns("event", &source).unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["count", "message", "score"]);
    }

    #[test]
    fn test_missing_properties_is_malformed() {
        let source = json!({ "event": { "dynamic": "strict" } });
        assert!(matches!(
            resolve_columns("event", &source),
            Err(CatalogError::MalformedMapping(_))
        ));
        assert!(matches!(
            resolve_columns("other", &json!({ "event": { "properties": {} } })),
            Err(CatalogError::MalformedMapping(_))
        ));
    }
}

use crate::models::RelationalType;

/// Map a search engine field type to a relational type.
/// Returns None for types without a relational counterpart.
pub fn map_remote_type(remote_type: &str) -> Option<RelationalType> {
    match remote_type {
        "double" | "float" => Some(RelationalType::Double),
        "integer" | "long" => Some(RelationalType::BigInt),
        "string" => Some(RelationalType::Varchar),
        _ => None,
    }
}

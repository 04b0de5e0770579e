use serde_json::{Map, Value};

/// Flatten a field-definition object into `path:value` leaf descriptors.
///
/// Nested objects are walked with their keys joined by `.`. Arrays are not
/// supported as columns and are skipped along with everything below them.
pub fn flatten_mapping(properties: &Map<String, Value>) -> Vec<String> {
    let mut leaves = Vec::new();
    collect_leaves("", properties, &mut leaves);
    leaves
}

fn collect_leaves(parent: &str, object: &Map<String, Value>, leaves: &mut Vec<String>) {
    for (key, child) in object {
        let child_path = if parent.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", parent, key)
        };

        match child {
            Value::Object(nested) => collect_leaves(&child_path, nested, leaves),
            Value::Array(_) => continue,
            Value::String(s) => leaves.push(format!("{}:{}", child_path, s)),
            scalar => leaves.push(format!("{}:{}", child_path, scalar)),
        }
    }
}

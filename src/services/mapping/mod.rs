// Field mapping to column resolution
//
// A document type's mapping is flattened into `path:value` leaves, the leaves
// that declare a field type are kept and the remote type is mapped to a
// relational one.
pub mod flattener;
pub mod resolver;
pub mod type_mapper;

pub use flattener::flatten_mapping;
pub use resolver::{resolve_column, resolve_columns, ColumnRejection};
pub use type_mapper::map_remote_type;

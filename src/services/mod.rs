pub mod catalog_loader;
pub mod column_merger;
pub mod datafusion; // DataFusion catalog registration
pub mod elasticsearch; // Field mapping retrieval
pub mod mapping; // Flattening and column resolution
pub mod schema_cache;

pub use catalog_loader::*;
pub use column_merger::*;
pub use schema_cache::*;

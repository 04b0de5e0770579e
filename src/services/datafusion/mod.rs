// DataFusion integration
//
// Registers resolved catalog snapshots so the relational query layer can
// plan against the discovered tables.
pub mod catalog;

pub use catalog::DataFusionCatalogRegistrar;

// Search engine access: the only network I/O of catalog resolution
pub mod adapter;
pub mod client;

pub use adapter::{IndexMappings, MappingFetcher, MappingMetadata};
pub use client::ElasticsearchMappingFetcher;

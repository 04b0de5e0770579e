pub mod metadata;
pub mod source;

pub use metadata::*;
pub use source::*;

use catalog::CatalogError;
use thiserror::Error;

pub mod builder;
pub mod manager;

pub use builder::{CatalogIndexBuilder, IndexBuilder};
pub use manager::{IndexManager, PhysicalIndex};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Index \"{index}\" cannot be built: {reason}")]
    InvalidStructure { index: String, reason: String },
}

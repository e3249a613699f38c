use super::DdlError;
use catalog::{IndexStructure, IndexType, Persistence};
use tracing::trace;

/// Inputs to [`IndexTypeResolver::resolve`]. The table-derived fields must be
/// read while the table's exclusive lock is held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexTypeRequest {
    pub primary_key: bool,
    pub unique_column_count: usize,
    pub hash: bool,
    pub spatial: bool,
    pub persistent_hint: bool,
    pub table_persists_indexes: bool,
    pub table_has_primary_key: bool,
}

/// Classifies a requested index into an [`IndexType`].
pub struct IndexTypeResolver;

impl IndexTypeResolver {
    pub fn resolve(table_name: &str, request: &IndexTypeRequest) -> Result<IndexType, DdlError> {
        // A table that does not persist its indexes makes every index transient.
        let persistence =
            Persistence::from(request.persistent_hint && request.table_persists_indexes);

        let index_type = if request.primary_key {
            if request.table_has_primary_key {
                return Err(DdlError::DuplicatePrimaryKey(table_name.to_string()));
            }
            if request.spatial {
                return Err(DdlError::InvalidIndexType(
                    "a primary key cannot be spatial".into(),
                ));
            }
            IndexType::primary_key(persistence, request.hash)
        } else if request.unique_column_count > 0 {
            if request.spatial {
                return Err(DdlError::InvalidIndexType(
                    "a unique index cannot be spatial".into(),
                ));
            }
            IndexType::unique(persistence, request.hash)
        } else {
            let structure = match (request.hash, request.spatial) {
                (true, true) => {
                    return Err(DdlError::InvalidIndexType(
                        "an index cannot be both hash and spatial".into(),
                    ))
                }
                (true, false) => IndexStructure::Hash,
                (false, true) => IndexStructure::Spatial,
                (false, false) => IndexStructure::Tree,
            };
            IndexType::non_unique(persistence, structure)
        };

        trace!(table = %table_name, %index_type, ?persistence, "index type resolved");
        Ok(index_type)
    }
}

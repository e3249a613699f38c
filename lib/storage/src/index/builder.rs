use super::{BuildError, IndexManager, PhysicalIndex};
use catalog::{IndexDefinition, IndexRef, Schema, Table};
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// Physically constructs an index and registers it on its table and schema.
///
/// Registration is all-or-nothing: on error nothing about the index is
/// visible in the catalog.
pub trait IndexBuilder: fmt::Debug + Send + Sync {
    fn build(
        &self,
        schema: &Schema,
        table: &Table,
        definition: IndexDefinition,
    ) -> Result<IndexRef, BuildError>;
}

/// The builder used by the engine: checks the physical constraints of the
/// requested structure, then registers the index through the catalog.
#[derive(Debug, Default)]
pub struct CatalogIndexBuilder {
    manager: Arc<IndexManager>,
}

impl CatalogIndexBuilder {
    pub fn new(manager: Arc<IndexManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<IndexManager> {
        &self.manager
    }

    /// A spatial tree indexes exactly one geometry column.
    fn check_structure(definition: &IndexDefinition) -> Result<(), BuildError> {
        if !definition.index_type().is_spatial() {
            return Ok(());
        }
        let invalid = |reason: String| BuildError::InvalidStructure {
            index: definition.name().clone(),
            reason,
        };
        match definition.columns().as_slice() {
            [column] if column.column().column_type().is_spatial() => Ok(()),
            [column] => Err(invalid(format!(
                "column \"{}\" of type {} is not spatial",
                column.column().column_name(),
                column.column().column_type()
            ))),
            columns => Err(invalid(format!(
                "a spatial index covers exactly one column, got {}",
                columns.len()
            ))),
        }
    }
}

impl IndexBuilder for CatalogIndexBuilder {
    #[instrument(skip_all, fields(index = %definition.name(), table = %table.name()))]
    fn build(
        &self,
        schema: &Schema,
        table: &Table,
        definition: IndexDefinition,
    ) -> Result<IndexRef, BuildError> {
        Self::check_structure(&definition)?;

        let index = table.add_index(schema, definition)?;
        let index_type = index.index_type();
        self.manager.register(PhysicalIndex::new(
            index.id(),
            index.name(),
            table.name(),
            index_type.structure(),
            index_type.persistence(),
        ));

        info!(index = %index, "index built");
        Ok(index)
    }
}

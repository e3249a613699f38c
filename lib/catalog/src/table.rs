use crate::{CatalogError, Column, Index, IndexDefinition, IndexRef, Schema};
use common::{ObjectId, SessionId};
use concurrency::{Interrupt, LockCoordinator, LockError, LockGuard, LockMode};
use getset::{CopyGetters, Getters};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

/// A reference-counted [`Table`] handle that can be shared across threads.
pub type TableRef = Arc<Table>;

#[derive(Debug, Clone, TypedBuilder, Getters, CopyGetters)]
pub struct TableDefinition {
    #[builder(setter(into))]
    #[getset(get = "pub")]
    name: String,
    #[getset(get = "pub")]
    columns: Vec<Column>,
    /// Temporary tables live for the session only and never persist indexes.
    #[builder(default = false)]
    #[getset(get_copy = "pub")]
    temporary: bool,
}

/// A table: an ordered column list plus the indexes defined over it.
///
/// Structural changes (new columns, new indexes) are only made while the
/// caller holds the table's exclusive lock; the inner `RwLock`s merely keep
/// concurrent readers from observing a half-written vector.
#[derive(Debug, Getters, CopyGetters)]
pub struct Table {
    #[getset(get_copy = "pub")]
    id: ObjectId,
    #[getset(get = "pub")]
    name: String,
    #[getset(get = "pub")]
    schema_name: String,
    /// Owner of the enclosing schema, who owns the table as well.
    #[getset(get = "pub")]
    owner: String,
    #[getset(get_copy = "pub")]
    temporary: bool,
    columns: RwLock<Vec<Column>>,
    indexes: RwLock<Vec<IndexRef>>,
    persist_indexes: AtomicBool,
    locks: Arc<LockCoordinator>,
}

impl Table {
    pub(crate) fn new(
        id: ObjectId,
        schema: &Schema,
        definition: TableDefinition,
        locks: Arc<LockCoordinator>,
    ) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for column in definition.columns.iter() {
            if !seen.insert(column.column_name().as_str()) {
                return Err(CatalogError::DuplicateColumn(column.column_name().clone()));
            }
        }

        Ok(Self {
            id,
            name: definition.name,
            schema_name: schema.name().clone(),
            owner: schema.owner().clone(),
            temporary: definition.temporary,
            columns: RwLock::new(definition.columns),
            indexes: RwLock::new(Vec::new()),
            persist_indexes: AtomicBool::new(!definition.temporary),
            locks,
        })
    }

    /// Locks the table on behalf of `session`. The lock is held until the
    /// returned guard is dropped.
    pub fn lock(
        &self,
        session: SessionId,
        mode: LockMode,
        timeout: Duration,
        interrupt: &Interrupt,
    ) -> Result<LockGuard, LockError> {
        self.locks
            .acquire(self.id, session, mode, timeout, interrupt)
    }

    /// Whether indexes on this table survive a restart (given a persistent
    /// database).
    pub fn is_persist_indexes(&self) -> bool {
        self.persist_indexes.load(Ordering::SeqCst)
    }

    pub fn set_persist_indexes(&self, persist_indexes: bool) {
        self.persist_indexes.store(persist_indexes, Ordering::SeqCst);
    }

    /// Snapshot of the current column list.
    pub fn columns(&self) -> Vec<Column> {
        self.columns.read().clone()
    }

    pub fn find_column(&self, column_name: &str) -> Option<(usize, Column)> {
        self.columns
            .read()
            .iter()
            .enumerate()
            .find(|(_, column)| column.column_name() == column_name)
            .map(|(position, column)| (position, column.clone()))
    }

    /// Appends a column. Callers hold the exclusive table lock.
    pub fn add_column(&self, column: Column) -> Result<(), CatalogError> {
        let mut columns = self.columns.write();
        if columns
            .iter()
            .any(|existing| existing.column_name() == column.column_name())
        {
            return Err(CatalogError::DuplicateColumn(column.column_name().clone()));
        }
        info!(table = %self.name, column = %column, "column added");
        columns.push(column);
        Ok(())
    }

    pub fn find_primary_key(&self) -> Option<IndexRef> {
        self.indexes
            .read()
            .iter()
            .find(|index| index.index_type().is_primary_key())
            .cloned()
    }

    pub fn indexes(&self) -> Vec<IndexRef> {
        self.indexes.read().clone()
    }

    /// Registers a new index on this table and in `schema` as one step: either
    /// the index ends up visible in both, or in neither.
    ///
    /// Callers hold the exclusive table lock, which keeps the column list and
    /// the primary key stable between validation and installation. The schema
    /// name claim is the only step that can race with other tables.
    pub fn add_index(
        &self,
        schema: &Schema,
        definition: IndexDefinition,
    ) -> Result<IndexRef, CatalogError> {
        let index = Arc::new(self.prepare_index(definition)?);
        schema.register_index(&index)?;
        self.install_index(&index);

        info!(
            schema = %self.schema_name,
            table = %self.name,
            index = %index.name(),
            id = %index.id(),
            "index registered"
        );
        Ok(index)
    }

    /// Removes the index with `id` from the table and from `schema`.
    pub fn remove_index(&self, schema: &Schema, id: ObjectId) -> Option<IndexRef> {
        let mut indexes = self.indexes.write();
        let position = indexes.iter().position(|index| index.id() == id)?;
        let index = indexes.remove(position);
        schema.unregister_index(index.name());
        debug!(table = %self.name, index = %index.name(), "index removed");
        Some(index)
    }

    /// Validates `definition` against the current table state without
    /// changing anything.
    fn prepare_index(&self, mut definition: IndexDefinition) -> Result<Index, CatalogError> {
        definition.validate()?;

        let is_primary_key = definition.index_type().is_primary_key();
        if is_primary_key && self.find_primary_key().is_some() {
            return Err(CatalogError::DuplicatePrimaryKey(self.name.clone()));
        }

        let columns = self.columns.read();
        for bound in definition.columns_mut() {
            let current = columns
                .get(bound.position())
                .filter(|column| column.column_name() == bound.column().column_name())
                .ok_or_else(|| CatalogError::UnresolvedColumn {
                    column: bound.column().column_name().clone(),
                    table: self.name.clone(),
                })?;
            *bound.column_mut() = current.clone();
            if is_primary_key {
                bound.column_mut().set_nullable(false);
            }
        }

        Ok(Index::new(definition, &self.schema_name, &self.name))
    }

    /// Installs a prepared index. Primary-key columns become NOT NULL.
    fn install_index(&self, index: &IndexRef) {
        if index.index_type().is_primary_key() {
            let mut columns = self.columns.write();
            for bound in index.columns() {
                if let Some(column) = columns.get_mut(bound.position()) {
                    column.set_nullable(false);
                }
            }
        }
        self.indexes.write().push(Arc::clone(index));
    }
}

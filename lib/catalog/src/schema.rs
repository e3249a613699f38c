use crate::{CatalogError, IndexRef, Table, TableRef};
use common::ObjectId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use getset::{CopyGetters, Getters};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// A reference-counted [`Schema`] handle that can be shared across threads.
pub type SchemaRef = Arc<Schema>;

/// [`Schema`] is the namespace owning tables and indexes.
///
/// Table names and index names are each unique within a schema. Lookups are
/// exact: identifier normalization happens before a name reaches the catalog.
#[derive(Debug, Getters, CopyGetters)]
pub struct Schema {
    #[getset(get_copy = "pub")]
    id: ObjectId,
    #[getset(get = "pub")]
    name: String,
    /// User that owns the schema and everything in it.
    #[getset(get = "pub")]
    owner: String,
    tables: DashMap<String, TableRef>,
    indexes: DashMap<String, IndexRef>,
    /// Generated names handed out but not yet registered.
    pub(crate) reserved_names: Mutex<HashSet<String>>,
}

impl Schema {
    pub fn new(id: ObjectId, name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            owner: owner.into(),
            tables: DashMap::new(),
            indexes: DashMap::new(),
            reserved_names: Mutex::new(HashSet::new()),
        }
    }

    pub fn find_table_or_view(&self, name: &str) -> Option<TableRef> {
        self.tables.get(name).map(|table| Arc::clone(table.value()))
    }

    pub fn find_index(&self, name: &str) -> Option<IndexRef> {
        self.indexes.get(name).map(|index| Arc::clone(index.value()))
    }

    pub(crate) fn add_table(&self, table: TableRef) -> Result<(), CatalogError> {
        match self.tables.entry(table.name().clone()) {
            Entry::Occupied(_) => Err(CatalogError::TableAlreadyExists(table.name().clone())),
            Entry::Vacant(entry) => {
                entry.insert(table);
                Ok(())
            }
        }
    }

    /// Removes `table` itself. A different table that has since taken the
    /// same name is left alone.
    pub(crate) fn remove_table(&self, table: &Table) -> Option<TableRef> {
        self.tables
            .remove_if(table.name(), |_, current| std::ptr::eq(current.as_ref(), table))
            .map(|(_, table)| table)
    }

    /// Returns `true` while `table` is the table registered under its name,
    /// i.e. it has not been dropped (and possibly replaced) since it was
    /// looked up.
    pub fn contains_table(&self, table: &Table) -> bool {
        self.tables
            .get(table.name())
            .map_or(false, |current| std::ptr::eq(current.value().as_ref(), table))
    }

    /// Claims `index`'s name. Atomic with respect to concurrent claims and
    /// lookups: of two registrations under one name exactly one succeeds.
    pub fn register_index(&self, index: &IndexRef) -> Result<(), CatalogError> {
        match self.indexes.entry(index.name().clone()) {
            Entry::Occupied(_) => Err(CatalogError::NameConflict(index.name().clone())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(index));
                Ok(())
            }
        }
    }

    pub fn unregister_index(&self, name: &str) -> Option<IndexRef> {
        self.indexes.remove(name).map(|(_, index)| index)
    }

    /// Returns `true` if a table or an index already goes by `name`.
    pub fn contains_name(&self, name: &str) -> bool {
        self.indexes.contains_key(name) || self.tables.contains_key(name)
    }

    /// Tables sorted by name.
    pub fn tables(&self) -> Vec<TableRef> {
        let mut tables: Vec<_> = self
            .tables
            .iter()
            .map(|table| Arc::clone(table.value()))
            .collect();
        tables.sort_by(|a, b| a.name().cmp(b.name()));
        tables
    }

    /// Indexes sorted by name.
    pub fn indexes(&self) -> Vec<IndexRef> {
        let mut indexes: Vec<_> = self
            .indexes
            .iter()
            .map(|index| Arc::clone(index.value()))
            .collect();
        indexes.sort_by(|a, b| a.name().cmp(b.name()));
        indexes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Column, Database, TableDefinition};
    use common::{DbConfig, StorageMode};
    use ty::DataTypeKind;

    #[test]
    fn test_table_names_are_unique() {
        let database = Database::new(
            &DbConfig::builder()
                .database("test")
                .mode(StorageMode::Memory)
                .build(),
        );
        let schema = database.main_schema();
        let definition = TableDefinition::builder()
            .name("T")
            .columns(vec![Column::new("A", DataTypeKind::Integer)])
            .build();

        database.create_table(&schema, definition.clone()).unwrap();
        let result = database.create_table(&schema, definition);

        assert_eq!(result.unwrap_err(), CatalogError::TableAlreadyExists("T".into()));
        assert_eq!(schema.tables().len(), 1);
        assert!(schema.contains_name("T"));
        assert!(schema.find_table_or_view("t").is_none());
    }

    #[test]
    fn test_replaced_table_is_not_current() {
        let database = Database::new(&DbConfig::builder().database("test").build());
        let schema = database.main_schema();
        let definition = TableDefinition::builder()
            .name("T")
            .columns(vec![Column::new("A", DataTypeKind::Integer)])
            .build();

        let old = database.create_table(&schema, definition.clone()).unwrap();
        assert!(schema.contains_table(&old));
        database.drop_table(&schema, &old).unwrap();
        let new = database.create_table(&schema, definition).unwrap();

        assert!(!schema.contains_table(&old));
        assert!(schema.contains_table(&new));
        // Dropping the stale handle must not take the new table with it.
        assert_eq!(
            database.drop_table(&schema, &old).unwrap_err(),
            CatalogError::TableNotFound("T".into())
        );
        assert!(schema.find_table_or_view("T").is_some());
    }
}

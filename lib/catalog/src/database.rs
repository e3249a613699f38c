use crate::{CatalogError, ObjectIdAllocator, Schema, SchemaRef, Table, TableDefinition, TableRef};
use common::config::MAIN_SCHEMA_NAME;
use common::{DbConfig, ObjectId};
use concurrency::LockCoordinator;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use getset::{CopyGetters, Getters};
use std::sync::Arc;
use tracing::info;

/// A reference-counted [`Database`] handle. This is the catalog handle that
/// sessions pass around; there is no global catalog.
pub type DatabaseRef = Arc<Database>;

#[derive(Debug, Getters, CopyGetters)]
pub struct Database {
    #[getset(get = "pub")]
    name: String,
    /// In-memory databases never persist anything.
    #[getset(get_copy = "pub")]
    persistent: bool,
    #[getset(get_copy = "pub")]
    case_sensitive_identifiers: bool,
    ids: ObjectIdAllocator,
    #[getset(get = "pub")]
    lock_coordinator: Arc<LockCoordinator>,
    schemas: DashMap<String, SchemaRef>,
    main_schema: SchemaRef,
}

impl Database {
    /// Opens an empty database whose main schema is owned by the configured
    /// user.
    pub fn new(config: &DbConfig) -> DatabaseRef {
        let ids = ObjectIdAllocator::new();
        let main_schema = Arc::new(Schema::new(ids.allocate(), MAIN_SCHEMA_NAME, config.user()));
        let schemas = DashMap::new();
        schemas.insert(MAIN_SCHEMA_NAME.to_string(), Arc::clone(&main_schema));

        info!(database = %config.database(), persistent = config.is_persistent(), "database opened");
        Arc::new(Self {
            name: config.database().clone(),
            persistent: config.is_persistent(),
            case_sensitive_identifiers: *config.case_sensitive_identifiers(),
            ids,
            lock_coordinator: LockCoordinator::new(),
            schemas,
            main_schema,
        })
    }

    pub fn allocate_object_id(&self) -> ObjectId {
        self.ids.allocate()
    }

    pub fn main_schema(&self) -> SchemaRef {
        Arc::clone(&self.main_schema)
    }

    pub fn find_schema(&self, name: &str) -> Option<SchemaRef> {
        self.schemas.get(name).map(|schema| Arc::clone(schema.value()))
    }

    pub fn create_schema(&self, name: &str, owner: &str) -> Result<SchemaRef, CatalogError> {
        match self.schemas.entry(name.to_string()) {
            Entry::Occupied(_) => Err(CatalogError::SchemaAlreadyExists(name.to_string())),
            Entry::Vacant(entry) => {
                let schema = Arc::new(Schema::new(self.ids.allocate(), name, owner));
                entry.insert(Arc::clone(&schema));
                info!(schema = %name, %owner, "schema created");
                Ok(schema)
            }
        }
    }

    /// Schemas sorted by name.
    pub fn schemas(&self) -> Vec<SchemaRef> {
        let mut schemas: Vec<_> = self
            .schemas
            .iter()
            .map(|schema| Arc::clone(schema.value()))
            .collect();
        schemas.sort_by(|a, b| a.name().cmp(b.name()));
        schemas
    }

    pub fn create_table(
        &self,
        schema: &Schema,
        definition: TableDefinition,
    ) -> Result<TableRef, CatalogError> {
        let table = Arc::new(Table::new(
            self.ids.allocate(),
            schema,
            definition,
            Arc::clone(&self.lock_coordinator),
        )?);
        schema.add_table(Arc::clone(&table))?;

        info!(schema = %schema.name(), table = %table.name(), id = %table.id(), "table created");
        Ok(table)
    }

    /// Removes `table` together with every index on it. Callers hold the
    /// table's exclusive lock. Fails if `table` was already dropped.
    pub fn drop_table(&self, schema: &Schema, table: &Table) -> Result<TableRef, CatalogError> {
        let table = schema
            .remove_table(table)
            .ok_or_else(|| CatalogError::TableNotFound(table.name().clone()))?;
        for index in table.indexes() {
            schema.unregister_index(index.name());
        }

        info!(schema = %schema.name(), table = %table.name(), id = %table.id(), "table dropped");
        Ok(table)
    }

    /// Canonical form of an unquoted identifier: upper case unless the
    /// database was opened with case-sensitive identifiers.
    pub fn normalize_identifier(&self, identifier: &str) -> String {
        if self.case_sensitive_identifiers {
            identifier.to_string()
        } else {
            identifier.to_uppercase()
        }
    }
}

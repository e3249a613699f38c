//! Data definition statements.

use auth::AuthError;
use catalog::{CatalogError, DatabaseRef, IndexColumn};
use concurrency::LockError;
use getset::{CopyGetters, Getters};
use std::sync::Arc;
use storage::{BuildError, IndexBuilder};
use thiserror::Error;
use typed_builder::TypedBuilder;

pub mod columns;
pub mod create_index;
pub mod index_type;

pub use columns::ColumnMapper;
pub use create_index::{create_index, CreateIndex, CreateIndexOutcome};
pub use index_type::{IndexTypeRequest, IndexTypeResolver};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DdlError {
    #[error("Table \"{0}\" not found")]
    TableNotFound(String),
    #[error("Schema \"{0}\" not found")]
    SchemaNotFound(String),
    #[error("Index \"{0}\" already exists")]
    IndexAlreadyExists(String),
    #[error("Attempt to add a second primary key to table \"{0}\"")]
    DuplicatePrimaryKey(String),
    #[error("Invalid index type: {0}")]
    InvalidIndexType(String),
    #[error("Column \"{column}\" not found in table \"{table}\"")]
    UnresolvedColumn { column: String, table: String },
    #[error("{0}")]
    PermissionDenied(String),
    #[error("Timeout trying to lock table \"{table}\" after {waited}")]
    LockTimeout { table: String, waited: String },
    #[error("Deadlock detected while waiting for table \"{0}\"")]
    Deadlock(String),
    #[error("Statement cancelled while waiting for table \"{0}\"")]
    Interrupted(String),
    #[error("Feature not supported: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Catalog(CatalogError),
}

impl DdlError {
    /// Lock errors only know the object id; callers attach the table name.
    pub fn from_lock(error: LockError, table: &str) -> Self {
        let table = table.to_string();
        match error {
            LockError::Timeout { waited, .. } => DdlError::LockTimeout { table, waited },
            LockError::Deadlock { .. } => DdlError::Deadlock(table),
            LockError::Interrupted { .. } => DdlError::Interrupted(table),
        }
    }
}

impl From<CatalogError> for DdlError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::TableNotFound(table) => DdlError::TableNotFound(table),
            CatalogError::SchemaNotFound(schema) => DdlError::SchemaNotFound(schema),
            CatalogError::NameConflict(name) => DdlError::IndexAlreadyExists(name),
            CatalogError::DuplicatePrimaryKey(table) => DdlError::DuplicatePrimaryKey(table),
            CatalogError::InvalidIndexType(reason) => DdlError::InvalidIndexType(reason),
            CatalogError::UnresolvedColumn { column, table } => {
                DdlError::UnresolvedColumn { column, table }
            }
            other => DdlError::Catalog(other),
        }
    }
}

impl From<AuthError> for DdlError {
    fn from(error: AuthError) -> Self {
        DdlError::PermissionDenied(error.to_string())
    }
}

impl From<BuildError> for DdlError {
    fn from(error: BuildError) -> Self {
        match error {
            BuildError::Catalog(error) => error.into(),
            error @ BuildError::InvalidStructure { .. } => {
                DdlError::InvalidIndexType(error.to_string())
            }
        }
    }
}

/// Everything a `CREATE INDEX` request says, before anything is resolved.
///
/// Names are taken verbatim; identifier normalization has already happened.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder, Getters, CopyGetters)]
pub struct CreateIndexSpec {
    /// Defaults to the database's main schema.
    #[builder(default, setter(into))]
    #[getset(get = "pub")]
    schema_name: Option<String>,
    #[builder(setter(into))]
    #[getset(get = "pub")]
    table_name: String,
    /// A name is generated when absent.
    #[builder(default, setter(into))]
    #[getset(get = "pub")]
    index_name: Option<String>,
    #[getset(get = "pub")]
    columns: Vec<IndexColumn>,
    #[builder(default)]
    #[getset(get_copy = "pub")]
    primary_key: bool,
    /// Leading columns forming the uniqueness key; zero for a plain index.
    /// Ignored for primary keys, which are unique over every column.
    #[builder(default)]
    #[getset(get_copy = "pub")]
    unique_column_count: usize,
    #[builder(default)]
    #[getset(get_copy = "pub")]
    hash: bool,
    #[builder(default)]
    #[getset(get_copy = "pub")]
    spatial: bool,
    #[builder(default)]
    #[getset(get_copy = "pub")]
    if_table_exists: bool,
    #[builder(default)]
    #[getset(get_copy = "pub")]
    if_not_exists: bool,
    #[builder(default, setter(into))]
    #[getset(get = "pub")]
    comment: Option<String>,
}

/// The catalog and collaborators a DDL statement runs against.
#[derive(Debug, Clone, TypedBuilder, Getters)]
#[getset(get = "pub")]
pub struct DdlContext {
    database: DatabaseRef,
    index_builder: Arc<dyn IndexBuilder>,
}

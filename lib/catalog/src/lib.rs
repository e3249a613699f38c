//! # Catalog
//!
//! In-memory catalog of a database: schemas, the tables and indexes they own,
//! and the allocator handing out object ids. Every catalog object is shared
//! behind an `Arc` and synchronizes its own mutable state, so a [`Database`]
//! handle can be passed to any number of sessions.

pub mod column;
pub mod database;
pub mod id;
pub mod index;
pub mod naming;
pub mod schema;
pub mod table;

pub use column::*;
pub use database::{Database, DatabaseRef};
pub use id::ObjectIdAllocator;
pub use index::*;
pub use naming::{NameReservation, NameResolver};
pub use schema::{Schema, SchemaRef};
pub use table::{Table, TableDefinition, TableRef};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Schema \"{0}\" not found")]
    SchemaNotFound(String),
    #[error("Schema \"{0}\" already exists")]
    SchemaAlreadyExists(String),
    #[error("Table \"{0}\" not found")]
    TableNotFound(String),
    #[error("Table \"{0}\" already exists")]
    TableAlreadyExists(String),
    #[error("Name \"{0}\" is already used by another index in this schema")]
    NameConflict(String),
    #[error("Column \"{0}\" is specified more than once")]
    DuplicateColumn(String),
    #[error("Column \"{column}\" not found in table \"{table}\"")]
    UnresolvedColumn { column: String, table: String },
    #[error("Attempt to define a second primary key on table \"{0}\"")]
    DuplicatePrimaryKey(String),
    #[error("Invalid index: {0}")]
    InvalidIndexType(String),
}

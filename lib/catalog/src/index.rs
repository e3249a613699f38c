//! # Index Metadata
//!
//! Catalog-side description of an index: which columns it covers and in what
//! order, how many of them form the uniqueness key, and its [`IndexType`].
//! Building the physical structure is the storage layer's business; the
//! catalog only records what was built.

use crate::{CatalogError, Column};
use common::ObjectId;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use typed_builder::TypedBuilder;

/// A reference-counted [`Index`] handle shared by the table and its schema.
pub type IndexRef = Arc<Index>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullsOrder {
    #[default]
    Default,
    First,
    Last,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    pub direction: SortDirection,
    pub nulls: NullsOrder,
}

impl SortOrder {
    pub fn descending() -> Self {
        Self {
            direction: SortDirection::Descending,
            nulls: NullsOrder::Default,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.direction == SortDirection::Descending {
            write!(f, " DESC")?;
        }
        match self.nulls {
            NullsOrder::Default => Ok(()),
            NullsOrder::First => write!(f, " NULLS FIRST"),
            NullsOrder::Last => write!(f, " NULLS LAST"),
        }
    }
}

/// A column reference as written in the statement, not yet resolved against
/// a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters, CopyGetters)]
pub struct IndexColumn {
    #[getset(get = "pub")]
    column_name: String,
    #[getset(get_copy = "pub")]
    sort_order: SortOrder,
}

impl IndexColumn {
    pub fn new(column_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            sort_order: SortOrder::default(),
        }
    }

    pub fn with_sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }
}

/// A column reference resolved to a concrete column of a specific table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters, CopyGetters)]
pub struct BoundColumn {
    #[getset(get = "pub")]
    column: Column,
    /// Position of the column in the table's column list.
    #[getset(get_copy = "pub")]
    position: usize,
    #[getset(get_copy = "pub")]
    sort_order: SortOrder,
}

impl BoundColumn {
    pub fn new(column: Column, position: usize, sort_order: SortOrder) -> Self {
        Self {
            column,
            position,
            sort_order,
        }
    }

    pub(crate) fn column_mut(&mut self) -> &mut Column {
        &mut self.column
    }
}

impl fmt::Display for BoundColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column.column_name(), self.sort_order)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    PrimaryKey,
    Unique,
    NonUnique,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexStructure {
    #[default]
    Tree,
    Hash,
    Spatial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Persistence {
    Persistent,
    Transient,
}

impl From<bool> for Persistence {
    fn from(persistent: bool) -> Self {
        if persistent {
            Persistence::Persistent
        } else {
            Persistence::Transient
        }
    }
}

/// Classification of an index. Immutable; every value that exists is a legal
/// combination. Spatial structures carry no uniqueness guarantee, so only
/// [`IndexType::non_unique`] can produce one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct IndexType {
    kind: IndexKind,
    structure: IndexStructure,
    persistence: Persistence,
}

impl IndexType {
    pub fn primary_key(persistence: Persistence, hash: bool) -> Self {
        Self {
            kind: IndexKind::PrimaryKey,
            structure: if hash { IndexStructure::Hash } else { IndexStructure::Tree },
            persistence,
        }
    }

    pub fn unique(persistence: Persistence, hash: bool) -> Self {
        Self {
            kind: IndexKind::Unique,
            structure: if hash { IndexStructure::Hash } else { IndexStructure::Tree },
            persistence,
        }
    }

    pub fn non_unique(persistence: Persistence, structure: IndexStructure) -> Self {
        Self {
            kind: IndexKind::NonUnique,
            structure,
            persistence,
        }
    }

    pub fn is_primary_key(&self) -> bool {
        self.kind == IndexKind::PrimaryKey
    }

    /// Primary keys are unique too.
    pub fn is_unique(&self) -> bool {
        self.kind != IndexKind::NonUnique
    }

    pub fn is_hash(&self) -> bool {
        self.structure == IndexStructure::Hash
    }

    pub fn is_spatial(&self) -> bool {
        self.structure == IndexStructure::Spatial
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence == Persistence::Persistent
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let structure = match self.structure {
            IndexStructure::Tree => "",
            IndexStructure::Hash => "HASH ",
            IndexStructure::Spatial => "SPATIAL ",
        };
        match self.kind {
            IndexKind::PrimaryKey if self.is_hash() => write!(f, "PRIMARY KEY HASH"),
            IndexKind::PrimaryKey => write!(f, "PRIMARY KEY"),
            IndexKind::Unique => write!(f, "UNIQUE {structure}INDEX"),
            IndexKind::NonUnique => write!(f, "{structure}INDEX"),
        }
    }
}

/// Everything needed to register a new index, as resolved by the DDL layer.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder, Getters, CopyGetters)]
pub struct IndexDefinition {
    #[getset(get_copy = "pub")]
    id: ObjectId,
    #[builder(setter(into))]
    #[getset(get = "pub")]
    name: String,
    #[getset(get = "pub")]
    columns: Vec<BoundColumn>,
    #[getset(get_copy = "pub")]
    unique_column_count: usize,
    #[getset(get_copy = "pub")]
    index_type: IndexType,
    #[builder(default, setter(into))]
    #[getset(get = "pub")]
    comment: Option<String>,
}

impl IndexDefinition {
    /// Checks the shape invariants every registered index satisfies.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.columns.is_empty() {
            return Err(CatalogError::InvalidIndexType(format!(
                "index \"{}\" must cover at least one column",
                self.name
            )));
        }
        if self.unique_column_count > self.columns.len() {
            return Err(CatalogError::InvalidIndexType(format!(
                "index \"{}\" has {} unique columns but only {} columns",
                self.name,
                self.unique_column_count,
                self.columns.len()
            )));
        }
        if self.index_type.is_primary_key() && self.unique_column_count != self.columns.len() {
            return Err(CatalogError::InvalidIndexType(format!(
                "primary key \"{}\" cannot have included columns",
                self.name
            )));
        }
        Ok(())
    }
}

/// A registered index.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct Index {
    #[getset(get_copy = "pub")]
    id: ObjectId,
    #[getset(get = "pub")]
    name: String,
    #[getset(get = "pub")]
    schema_name: String,
    #[getset(get = "pub")]
    table_name: String,
    #[getset(get = "pub")]
    columns: Vec<BoundColumn>,
    #[getset(get_copy = "pub")]
    unique_column_count: usize,
    #[getset(get_copy = "pub")]
    index_type: IndexType,
    #[getset(get = "pub")]
    comment: Option<String>,
}

impl Index {
    pub(crate) fn new(definition: IndexDefinition, schema_name: &str, table_name: &str) -> Self {
        Self {
            id: definition.id,
            name: definition.name,
            schema_name: schema_name.to_string(),
            table_name: table_name.to_string(),
            columns: definition.columns,
            unique_column_count: definition.unique_column_count,
            index_type: definition.index_type,
            comment: definition.comment,
        }
    }

    /// Columns after the uniqueness key, carried along as payload.
    pub fn included_columns(&self) -> &[BoundColumn] {
        &self.columns[self.unique_column_count..]
    }

}

impl IndexDefinition {
    pub(crate) fn columns_mut(&mut self) -> &mut [BoundColumn] {
        &mut self.columns
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns = self
            .columns
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "{} {} ON {}.{}({})",
            self.index_type, self.name, self.schema_name, self.table_name, columns
        )
    }
}

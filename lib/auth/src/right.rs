use crate::{AuthError, User};
use catalog::Table;
use std::fmt;

/// A privilege a user can hold on a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Right {
    Select,
    Insert,
    Update,
    Delete,
    /// Structural changes: creating indexes and constraints, altering columns.
    SchemaOwner,
}

impl Right {
    /// What `GRANT ALL` hands out.
    pub const ALL: [Right; 5] = [
        Right::Select,
        Right::Insert,
        Right::Update,
        Right::Delete,
        Right::SchemaOwner,
    ];
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Right::Select => "SELECT",
            Right::Insert => "INSERT",
            Right::Update => "UPDATE",
            Right::Delete => "DELETE",
            Right::SchemaOwner => "SCHEMA_OWNER",
        };
        f.write_str(name)
    }
}

/// Decides whether a principal may change a table's structure.
pub trait AuthorizationGate {
    fn require_schema_owner_right(&self, table: &Table) -> Result<(), AuthError>;
}

impl AuthorizationGate for User {
    fn require_schema_owner_right(&self, table: &Table) -> Result<(), AuthError> {
        self.check_table_right(table, Right::SchemaOwner)
    }
}

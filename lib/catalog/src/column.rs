//! # Column Representation
//!
//! A [`Column`] is one entry of a table's ordered column list: its name, its
//! type tag and whether it accepts NULL.
//!
//! ```
//! use catalog::Column;
//! use ty::DataTypeKind;
//!
//! let id = Column::new("ID", DataTypeKind::Integer).not_null();
//! assert!(!id.nullable());
//! ```

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use std::fmt;
use ty::DataTypeKind;
use typed_builder::TypedBuilder;

/// Represents a column in a database table.
///
/// ```ignore
/// +--------------+--------------+----------+
/// | column_name  | column_type  | nullable |
/// +--------------+--------------+----------+
/// | ID           | INTEGER      | false    |
/// | NAME         | VARCHAR      | true     |
/// +--------------+--------------+----------+
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TypedBuilder,
    Getters,
    CopyGetters,
)]
pub struct Column {
    #[builder(setter(into))]
    #[getset(get = "pub")]
    column_name: String,
    #[getset(get_copy = "pub")]
    column_type: DataTypeKind,
    #[builder(default = true)]
    #[getset(get_copy = "pub")]
    nullable: bool,
}

impl Column {
    /// Creates a new nullable column.
    pub fn new(column_name: impl Into<String>, column_type: DataTypeKind) -> Self {
        Column::builder()
            .column_name(column_name)
            .column_type(column_type)
            .build()
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub(crate) fn set_nullable(&mut self, nullable: bool) {
        self.nullable = nullable;
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.column_name, self.column_type)?;
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        Ok(())
    }
}

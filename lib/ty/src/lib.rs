//! # Type System
//!
//! Column type tags as seen by the catalog. Values themselves live below the
//! catalog layer; DDL only needs to know a column's kind, e.g. to decide
//! whether it can back a spatial index.
//!
//! ```
//! use ty::DataTypeKind;
//!
//! let kind: DataTypeKind = "polygon".parse().unwrap();
//! assert!(kind.is_spatial());
//! assert!(!DataTypeKind::Integer.is_spatial());
//! ```

use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("Unknown data type `{0}`")]
    UnknownType(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DataTypeKind {
    #[default]
    Null,
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Real,
    DoublePrecision,
    Float,
    Text,
    VarChar,
    Blob,
    DateTime,
    Json,
    Uuid,
    Boolean,
    Point,
    Line,
    LineSegment,
    Box,
    Path,
    Polygon,
    Circle,
    Geometry,
}

impl DataTypeKind {
    /// Returns `true` for geometric types, the only kinds a spatial index can cover.
    pub fn is_spatial(&self) -> bool {
        matches!(
            self,
            DataTypeKind::Point
                | DataTypeKind::Line
                | DataTypeKind::LineSegment
                | DataTypeKind::Box
                | DataTypeKind::Path
                | DataTypeKind::Polygon
                | DataTypeKind::Circle
                | DataTypeKind::Geometry
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataTypeKind::Null => "NULL",
            DataTypeKind::SmallInt => "SMALLINT",
            DataTypeKind::Integer => "INTEGER",
            DataTypeKind::BigInt => "BIGINT",
            DataTypeKind::Decimal => "DECIMAL",
            DataTypeKind::Real => "REAL",
            DataTypeKind::DoublePrecision => "DOUBLE PRECISION",
            DataTypeKind::Float => "FLOAT",
            DataTypeKind::Text => "TEXT",
            DataTypeKind::VarChar => "VARCHAR",
            DataTypeKind::Blob => "BLOB",
            DataTypeKind::DateTime => "DATETIME",
            DataTypeKind::Json => "JSON",
            DataTypeKind::Uuid => "UUID",
            DataTypeKind::Boolean => "BOOLEAN",
            DataTypeKind::Point => "POINT",
            DataTypeKind::Line => "LINE",
            DataTypeKind::LineSegment => "LSEG",
            DataTypeKind::Box => "BOX",
            DataTypeKind::Path => "PATH",
            DataTypeKind::Polygon => "POLYGON",
            DataTypeKind::Circle => "CIRCLE",
            DataTypeKind::Geometry => "GEOMETRY",
        }
    }
}

impl FromStr for DataTypeKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.to_ascii_uppercase().as_str() {
            "SMALLINT" | "INT2" => DataTypeKind::SmallInt,
            "INT" | "INTEGER" | "INT4" => DataTypeKind::Integer,
            "BIGINT" | "INT8" => DataTypeKind::BigInt,
            "DECIMAL" | "NUMERIC" => DataTypeKind::Decimal,
            "REAL" => DataTypeKind::Real,
            "DOUBLE" | "DOUBLE PRECISION" => DataTypeKind::DoublePrecision,
            "FLOAT" => DataTypeKind::Float,
            "TEXT" => DataTypeKind::Text,
            "VARCHAR" | "CHARACTER VARYING" => DataTypeKind::VarChar,
            "BLOB" | "BYTEA" => DataTypeKind::Blob,
            "DATETIME" | "TIMESTAMP" => DataTypeKind::DateTime,
            "JSON" => DataTypeKind::Json,
            "UUID" => DataTypeKind::Uuid,
            "BOOL" | "BOOLEAN" => DataTypeKind::Boolean,
            "POINT" => DataTypeKind::Point,
            "LINE" => DataTypeKind::Line,
            "LSEG" => DataTypeKind::LineSegment,
            "BOX" => DataTypeKind::Box,
            "PATH" => DataTypeKind::Path,
            "POLYGON" => DataTypeKind::Polygon,
            "CIRCLE" => DataTypeKind::Circle,
            "GEOMETRY" => DataTypeKind::Geometry,
            _ => return Err(TypeError::UnknownType(s.to_string())),
        };
        Ok(kind)
    }
}

impl fmt::Display for DataTypeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

//! Default names for unnamed schema objects.

use crate::{CatalogError, Schema, Table};
use std::fmt;
use tracing::debug;

/// Generates and checks index names within a schema.
pub struct NameResolver;

impl NameResolver {
    /// Picks `prefix || n` for the smallest `n ≥ 1` that names no table or
    /// index in `schema` and is not reserved by another in-flight creation.
    ///
    /// The name stays reserved until the returned guard is dropped, so callers
    /// keep the guard alive until the object is registered (or abandoned).
    pub fn unique_name<'a>(schema: &'a Schema, table: &Table, prefix: &str) -> NameReservation<'a> {
        let mut reserved = schema.reserved_names.lock();
        let mut sequence: u64 = 1;
        let name = loop {
            let candidate = format!("{prefix}{sequence}");
            if !reserved.contains(&candidate) && !schema.contains_name(&candidate) {
                break candidate;
            }
            sequence += 1;
        };
        reserved.insert(name.clone());

        debug!(schema = %schema.name(), table = %table.name(), %name, "generated index name");
        NameReservation { schema, name }
    }

    /// Fails with [`CatalogError::NameConflict`] if an index called `name`
    /// already exists in `schema`.
    pub fn check_available(schema: &Schema, name: &str) -> Result<(), CatalogError> {
        match schema.find_index(name) {
            Some(_) => Err(CatalogError::NameConflict(name.to_string())),
            None => Ok(()),
        }
    }
}

/// A generated name held back from other generators. Released on drop.
pub struct NameReservation<'a> {
    schema: &'a Schema,
    name: String,
}

impl NameReservation<'_> {
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for NameReservation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NameReservation").field(&self.name).finish()
    }
}

impl Drop for NameReservation<'_> {
    fn drop(&mut self) {
        self.schema.reserved_names.lock().remove(&self.name);
    }
}

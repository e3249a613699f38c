use crate::password::{PasswordHash, DEFAULT_COST};
use crate::{AuthError, Right};
use catalog::{Schema, Table};
use common::ObjectId;
use dashmap::DashMap;
use getset::{CopyGetters, Getters};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// A reference-counted [`User`] handle shared by the sessions it opened.
pub type UserRef = Arc<User>;

/// A principal. Admins hold every right; everybody else holds the rights of
/// the schemas they own plus whatever was granted on individual tables.
#[derive(Debug, Getters, CopyGetters)]
pub struct User {
    #[getset(get = "pub")]
    name: String,
    #[getset(get_copy = "pub")]
    admin: bool,
    password: Option<PasswordHash>,
    /// Grants keyed by table id, so they die with the table they were
    /// granted on.
    grants: DashMap<ObjectId, HashSet<Right>>,
}

impl User {
    /// A user that authenticates without a password.
    pub fn new(name: impl Into<String>, admin: bool) -> Self {
        Self {
            name: name.into(),
            admin,
            password: None,
            grants: DashMap::new(),
        }
    }

    pub fn with_password(
        name: impl Into<String>,
        password: &str,
        admin: bool,
    ) -> Result<Self, AuthError> {
        Self::with_password_cost(name, password, admin, DEFAULT_COST)
    }

    pub fn with_password_cost(
        name: impl Into<String>,
        password: &str,
        admin: bool,
        cost: u32,
    ) -> Result<Self, AuthError> {
        let mut user = Self::new(name, admin);
        user.password = Some(PasswordHash::new(password, cost)?);
        Ok(user)
    }

    /// Users without a password accept only the empty password.
    pub fn authenticate(&self, password: &str) -> Result<(), AuthError> {
        let accepted = match &self.password {
            Some(hash) => hash.matches(password),
            None => password.is_empty(),
        };
        if accepted {
            Ok(())
        } else {
            warn!(user = %self.name, "authentication failed");
            Err(AuthError::WrongCredentials)
        }
    }

    pub fn grant(&self, table: &Table, right: Right) {
        debug!(user = %self.name, table = %table.name(), %right, "right granted");
        self.grants.entry(table.id()).or_default().insert(right);
    }

    pub fn revoke(&self, table: &Table, right: Right) {
        debug!(user = %self.name, table = %table.name(), %right, "right revoked");
        if let Some(mut rights) = self.grants.get_mut(&table.id()) {
            rights.remove(&right);
        }
    }

    /// Drops every grant on the table with `table_id`.
    pub fn forget_table(&self, table_id: ObjectId) {
        self.grants.remove(&table_id);
    }

    pub fn check_admin(&self) -> Result<(), AuthError> {
        if self.admin {
            Ok(())
        } else {
            Err(AuthError::AdminRequired(self.name.clone()))
        }
    }

    pub fn owns_schema(&self, schema: &Schema) -> bool {
        self.admin || schema.owner() == &self.name
    }

    pub fn check_schema_owner(&self, schema: &Schema) -> Result<(), AuthError> {
        if self.owns_schema(schema) {
            return Ok(());
        }
        Err(AuthError::PermissionDenied {
            user: self.name.clone(),
            object: schema.name().clone(),
            right: Right::SchemaOwner,
        })
    }

    pub fn has_table_right(&self, table: &Table, right: Right) -> bool {
        if self.admin || table.owner() == &self.name {
            return true;
        }
        self.grants
            .get(&table.id())
            .map_or(false, |rights| rights.contains(&right))
    }

    pub fn check_table_right(&self, table: &Table, right: Right) -> Result<(), AuthError> {
        if self.has_table_right(table, right) {
            return Ok(());
        }
        warn!(user = %self.name, table = %table.name(), %right, "permission denied");
        Err(AuthError::PermissionDenied {
            user: self.name.clone(),
            object: format!("{}.{}", table.schema_name(), table.name()),
            right,
        })
    }
}

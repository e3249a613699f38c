//! Lowering of parsed statements onto catalog operations.
//!
//! Primary keys and unique constraints, whether declared inline on a column,
//! as table constraints, or added later with `ALTER TABLE`, all become
//! `CREATE INDEX` requests and go through the same protocol.

use crate::{Driver, DriverError};
use anyhow::{bail, Result};
use auth::Right;
use catalog::{
    CatalogError, Column, IndexColumn, NullsOrder, Schema, SchemaRef, SortDirection, SortOrder,
    Table, TableDefinition,
};
use concurrency::{LockGuard, LockMode};
use execution::{create_index, CreateIndexSpec, DdlError, Session};
use sqlparser::ast::{
    Action, AlterTableOperation, ColumnDef, ColumnOption, DataType, Expr, GrantObjects, Ident,
    ObjectName, ObjectType, OrderByExpr, Privileges, SchemaName, Statement, TableConstraint,
};
use ty::DataTypeKind;
use tracing::{debug, info};

/// A primary key or unique constraint, before it is turned into an index.
#[derive(Debug)]
struct KeyConstraint {
    name: Option<String>,
    columns: Vec<String>,
    primary_key: bool,
}

impl KeyConstraint {
    fn into_spec(self, schema: &str, table: &str, if_table_exists: bool) -> CreateIndexSpec {
        let unique_column_count = if self.primary_key { 0 } else { self.columns.len() };
        CreateIndexSpec::builder()
            .schema_name(Some(schema.to_string()))
            .table_name(table)
            .index_name(self.name)
            .columns(self.columns.into_iter().map(IndexColumn::new).collect())
            .primary_key(self.primary_key)
            .unique_column_count(unique_column_count)
            .if_table_exists(if_table_exists)
            .build()
    }
}

fn column_type(data_type: &DataType) -> Result<DataTypeKind> {
    // `VARCHAR(20)` and `VARCHAR` are the same kind.
    let rendered = data_type.to_string();
    let base = rendered.split('(').next().unwrap_or_default().trim();
    base.parse()
        .map_err(|_| DriverError::UnknownType(rendered.clone()).into())
}

fn rights(privileges: &Privileges) -> Result<Vec<Right>> {
    match privileges {
        Privileges::All { .. } => Ok(Right::ALL.to_vec()),
        Privileges::Actions(actions) => actions
            .iter()
            .map(|action| match action {
                Action::Select { .. } => Ok(Right::Select),
                Action::Insert { .. } => Ok(Right::Insert),
                Action::Update { .. } => Ok(Right::Update),
                Action::Delete { .. } => Ok(Right::Delete),
                other => Err(DriverError::Unsupported(format!("privilege {other}")).into()),
            })
            .collect(),
    }
}

fn sort_order(column: &OrderByExpr) -> SortOrder {
    let direction = match column.asc {
        Some(false) => SortDirection::Descending,
        _ => SortDirection::Ascending,
    };
    let nulls = match column.nulls_first {
        Some(true) => NullsOrder::First,
        Some(false) => NullsOrder::Last,
        None => NullsOrder::Default,
    };
    SortOrder { direction, nulls }
}

impl Driver {
    pub(crate) fn execute_statement(&self, session: &Session, statement: Statement) -> Result<u64> {
        session.start_statement();
        match statement {
            Statement::CreateSchema {
                schema_name,
                if_not_exists,
                ..
            } => self.create_schema(session, &schema_name, if_not_exists),
            statement @ Statement::CreateTable { .. } => self.create_table(session, statement),
            statement @ Statement::CreateIndex { .. } => self.create_index(session, statement),
            Statement::AlterTable {
                name,
                if_exists,
                operations,
                ..
            } => {
                let mut rows = 0;
                for operation in operations {
                    rows += self.alter_table(session, &name, if_exists, operation)?;
                }
                Ok(rows)
            }
            Statement::Drop {
                object_type,
                if_exists,
                names,
                ..
            } => {
                for name in &names {
                    match &object_type {
                        ObjectType::Table => self.drop_table(session, name, if_exists)?,
                        ObjectType::Index => self.drop_index(session, name, if_exists)?,
                        other => bail!(DriverError::Unsupported(format!("DROP {other}"))),
                    }
                }
                Ok(0)
            }
            Statement::Grant {
                privileges,
                objects,
                grantees,
                ..
            } => self.change_rights(session, &privileges, &objects, &grantees, true),
            Statement::Revoke {
                privileges,
                objects,
                grantees,
                ..
            } => self.change_rights(session, &privileges, &objects, &grantees, false),
            other => {
                let sql = other.to_string();
                let keyword = sql.split_whitespace().take(2).collect::<Vec<_>>().join(" ");
                bail!(DriverError::Unsupported(keyword))
            }
        }
    }

    /// Unquoted identifiers follow the database's case policy; quoted ones are
    /// taken as written.
    fn identifier(&self, ident: &Ident) -> String {
        match ident.quote_style {
            Some(_) => ident.value.clone(),
            None => self.database.normalize_identifier(&ident.value),
        }
    }

    fn split_name(&self, name: &ObjectName) -> Result<(Option<String>, String)> {
        match name.0.as_slice() {
            [object] => Ok((None, self.identifier(object))),
            [schema, object] => Ok((Some(self.identifier(schema)), self.identifier(object))),
            _ => bail!(DriverError::InvalidName(name.to_string())),
        }
    }

    fn schema(&self, name: Option<&str>) -> Result<SchemaRef> {
        match name {
            Some(name) => self
                .database
                .find_schema(name)
                .ok_or_else(|| DdlError::SchemaNotFound(name.to_string()).into()),
            None => Ok(self.database.main_schema()),
        }
    }

    pub(crate) fn resolve(&self, name: &ObjectName) -> Result<(SchemaRef, String)> {
        let (schema, object) = self.split_name(name)?;
        Ok((self.schema(schema.as_deref())?, object))
    }

    pub(crate) fn lock_table(
        &self,
        session: &Session,
        table: &Table,
        mode: LockMode,
    ) -> Result<LockGuard> {
        let guard = table
            .lock(
                session.id(),
                mode,
                session.lock_timeout(),
                session.interrupt(),
            )
            .map_err(|error| DdlError::from_lock(error, table.name()))?;
        Ok(guard)
    }

    fn create_schema(&self, session: &Session, name: &SchemaName, if_not_exists: bool) -> Result<u64> {
        session.user().check_admin()?;

        let (name, owner) = match name {
            SchemaName::Simple(name) => (self.split_name(name)?.1, None),
            SchemaName::UnnamedAuthorization(owner) => (self.identifier(owner), Some(owner)),
            SchemaName::NamedAuthorization(name, owner) => (self.split_name(name)?.1, Some(owner)),
        };
        let owner = match owner {
            Some(owner) => self
                .find_user(&owner.value)
                .ok_or_else(|| DriverError::UserNotFound(owner.value.clone()))?
                .name()
                .clone(),
            None => session.user().name().clone(),
        };

        match self.database.create_schema(&name, &owner) {
            Ok(_) => Ok(0),
            Err(CatalogError::SchemaAlreadyExists(_)) if if_not_exists => Ok(0),
            Err(error) => Err(error.into()),
        }
    }

    /// Lowers a column definition. Inline `PRIMARY KEY` / `UNIQUE` come back as
    /// key constraints.
    fn column(&self, definition: &ColumnDef) -> Result<(Column, Vec<KeyConstraint>)> {
        let column_name = self.identifier(&definition.name);
        let mut nullable = true;
        let mut keys = Vec::new();
        for option in &definition.options {
            match &option.option {
                ColumnOption::NotNull => nullable = false,
                ColumnOption::Null => nullable = true,
                ColumnOption::Unique { is_primary, .. } => keys.push(KeyConstraint {
                    name: option.name.as_ref().map(|name| self.identifier(name)),
                    columns: vec![column_name.clone()],
                    primary_key: *is_primary,
                }),
                // Defaults, checks and the like are not enforced.
                other => debug!(column = %column_name, option = %other, "column option ignored"),
            }
        }

        let column = Column::builder()
            .column_name(column_name)
            .column_type(column_type(&definition.data_type)?)
            .nullable(nullable)
            .build();
        Ok((column, keys))
    }

    fn key_constraint(&self, constraint: &TableConstraint) -> Result<KeyConstraint> {
        match constraint {
            TableConstraint::Unique {
                name,
                columns,
                is_primary,
                ..
            } => Ok(KeyConstraint {
                name: name.as_ref().map(|name| self.identifier(name)),
                columns: columns.iter().map(|column| self.identifier(column)).collect(),
                primary_key: *is_primary,
            }),
            other => bail!(DriverError::Unsupported(format!("constraint {other}"))),
        }
    }

    fn create_table(&self, session: &Session, statement: Statement) -> Result<u64> {
        let Statement::CreateTable {
            name,
            columns,
            constraints,
            temporary,
            if_not_exists,
            ..
        } = statement
        else {
            bail!(DriverError::Unsupported("CREATE TABLE".into()));
        };

        let (schema, table_name) = self.resolve(&name)?;
        session.user().check_schema_owner(&schema)?;
        if if_not_exists && schema.find_table_or_view(&table_name).is_some() {
            return Ok(0);
        }

        let mut table_columns = Vec::with_capacity(columns.len());
        let mut keys = Vec::new();
        for definition in &columns {
            let (column, column_keys) = self.column(definition)?;
            table_columns.push(column);
            keys.extend(column_keys);
        }
        for constraint in &constraints {
            keys.push(self.key_constraint(constraint)?);
        }

        let created = self.database.create_table(
            &schema,
            TableDefinition::builder()
                .name(table_name)
                .columns(table_columns)
                .temporary(temporary)
                .build(),
        );
        let table = match created {
            Ok(table) => table,
            // Lost a race against another creation of the same table.
            Err(CatalogError::TableAlreadyExists(_)) if if_not_exists => return Ok(0),
            Err(error) => return Err(error.into()),
        };
        for key in keys {
            let spec = key.into_spec(schema.name(), table.name(), false);
            if let Err(error) = create_index(session, &self.ddl, spec) {
                // A table whose constraints could not be created is not created.
                let _lock = self.lock_table(session, &table, LockMode::Exclusive)?;
                self.remove_table(&schema, &table)?;
                return Err(error.into());
            }
        }
        Ok(0)
    }

    fn create_index(&self, session: &Session, statement: Statement) -> Result<u64> {
        let Statement::CreateIndex {
            name,
            table_name,
            using,
            columns,
            unique,
            concurrently,
            if_not_exists,
            include,
            predicate,
            ..
        } = statement
        else {
            bail!(DriverError::Unsupported("CREATE INDEX".into()));
        };

        if concurrently {
            bail!(DdlError::Unsupported("CREATE INDEX CONCURRENTLY".into()));
        }
        if predicate.is_some() {
            bail!(DdlError::Unsupported("partial indexes".into()));
        }

        let (table_schema, table) = self.split_name(&table_name)?;
        let (index_schema, index_name) = match &name {
            Some(name) => {
                let (schema, index) = self.split_name(name)?;
                (schema, Some(index))
            }
            None => (None, None),
        };
        let schema_name = match (table_schema, index_schema) {
            (Some(table_schema), Some(index_schema)) if table_schema != index_schema => {
                bail!(DriverError::InvalidName(format!(
                    "index schema {index_schema} differs from table schema {table_schema}"
                )))
            }
            (table_schema, index_schema) => table_schema.or(index_schema),
        };

        let method = using.map(|method| method.value.to_ascii_lowercase());
        let (hash, spatial) = match method.as_deref() {
            None | Some("btree") | Some("tree") => (false, false),
            Some("hash") => (true, false),
            Some("spatial") | Some("rtree") | Some("gist") => (false, true),
            Some(other) => bail!(DdlError::Unsupported(format!("index method {other}"))),
        };

        let mut index_columns = Vec::with_capacity(columns.len() + include.len());
        for column in &columns {
            let column_name = match &column.expr {
                Expr::Identifier(ident) => self.identifier(ident),
                Expr::CompoundIdentifier(parts) => match parts.last() {
                    Some(ident) => self.identifier(ident),
                    None => bail!(DriverError::InvalidName(column.to_string())),
                },
                other => bail!(DdlError::Unsupported(format!("index on expression {other}"))),
            };
            index_columns.push(IndexColumn::new(column_name).with_sort_order(sort_order(column)));
        }
        // Included columns ride along after the key.
        index_columns.extend(include.iter().map(|ident| IndexColumn::new(self.identifier(ident))));

        let spec = CreateIndexSpec::builder()
            .schema_name(schema_name)
            .table_name(table)
            .index_name(index_name)
            .columns(index_columns)
            .unique_column_count(if unique { columns.len() } else { 0 })
            .hash(hash)
            .spatial(spatial)
            .if_not_exists(if_not_exists)
            .build();
        Ok(create_index(session, &self.ddl, spec)?)
    }

    fn alter_table(
        &self,
        session: &Session,
        name: &ObjectName,
        if_exists: bool,
        operation: AlterTableOperation,
    ) -> Result<u64> {
        match operation {
            AlterTableOperation::AddConstraint(constraint) => {
                let key = self.key_constraint(&constraint)?;
                let (schema, table) = self.resolve(name)?;
                Ok(create_index(
                    session,
                    &self.ddl,
                    key.into_spec(schema.name(), &table, if_exists),
                )?)
            }
            AlterTableOperation::AddColumn { column_def, .. } => {
                self.add_column(session, name, if_exists, &column_def)
            }
            other => bail!(DriverError::Unsupported(format!("ALTER TABLE {other}"))),
        }
    }

    fn add_column(
        &self,
        session: &Session,
        name: &ObjectName,
        if_exists: bool,
        definition: &ColumnDef,
    ) -> Result<u64> {
        let (schema, table_name) = self.resolve(name)?;
        let Some(table) = schema.find_table_or_view(&table_name) else {
            if if_exists {
                return Ok(0);
            }
            bail!(DdlError::TableNotFound(table_name));
        };
        session.user().check_table_right(&table, Right::SchemaOwner)?;

        let (column, keys) = self.column(definition)?;
        {
            let _lock = self.lock_table(session, &table, LockMode::Exclusive)?;
            if !schema.contains_table(&table) {
                if if_exists {
                    return Ok(0);
                }
                bail!(DdlError::TableNotFound(table_name));
            }
            table.add_column(column)?;
        }
        for key in keys {
            create_index(
                session,
                &self.ddl,
                key.into_spec(schema.name(), table.name(), false),
            )?;
        }
        Ok(0)
    }

    fn drop_table(&self, session: &Session, name: &ObjectName, if_exists: bool) -> Result<()> {
        let (schema, table_name) = self.resolve(name)?;
        let Some(table) = schema.find_table_or_view(&table_name) else {
            if if_exists {
                return Ok(());
            }
            bail!(DdlError::TableNotFound(table_name));
        };
        session.user().check_table_right(&table, Right::SchemaOwner)?;

        let _lock = self.lock_table(session, &table, LockMode::Exclusive)?;
        match self.remove_table(&schema, &table) {
            // Somebody else dropped it while this session waited.
            Err(CatalogError::TableNotFound(_)) if if_exists => Ok(()),
            result => Ok(result?),
        }
    }

    fn drop_index(&self, session: &Session, name: &ObjectName, if_exists: bool) -> Result<()> {
        let (schema, index_name) = self.resolve(name)?;
        let Some(index) = schema.find_index(&index_name) else {
            if if_exists {
                return Ok(());
            }
            bail!(DriverError::IndexNotFound(index_name));
        };
        let table = schema
            .find_table_or_view(index.table_name())
            .ok_or_else(|| DdlError::TableNotFound(index.table_name().clone()))?;
        session.user().check_table_right(&table, Right::SchemaOwner)?;

        let _lock = self.lock_table(session, &table, LockMode::Exclusive)?;
        if !schema.contains_table(&table) {
            // The index went away with its table.
            if if_exists {
                return Ok(());
            }
            bail!(DriverError::IndexNotFound(index_name));
        }
        if table.remove_index(&schema, index.id()).is_some() {
            self.index_manager.drop_index(index.id());
            info!(index = %index_name, table = %table.name(), "index dropped");
        }
        Ok(())
    }

    /// Drops `table` from the catalog along with its built indexes and every
    /// grant on it. Callers hold the table's exclusive lock.
    fn remove_table(&self, schema: &Schema, table: &Table) -> Result<(), CatalogError> {
        self.database.drop_table(schema, table)?;
        for index in table.indexes() {
            self.index_manager.drop_index(index.id());
        }
        for user in self.users.iter() {
            user.forget_table(table.id());
        }
        Ok(())
    }

    /// `GRANT` and `REVOKE` on tables. Only the owner of a table's schema may
    /// hand out rights on it.
    fn change_rights(
        &self,
        session: &Session,
        privileges: &Privileges,
        objects: &GrantObjects,
        grantees: &[Ident],
        grant: bool,
    ) -> Result<u64> {
        let rights = rights(privileges)?;
        let GrantObjects::Tables(names) = objects else {
            bail!(DriverError::Unsupported(format!("rights on {objects}")));
        };
        let users = grantees
            .iter()
            .map(|grantee| {
                self.find_user(&grantee.value)
                    .ok_or_else(|| DriverError::UserNotFound(grantee.value.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for name in names {
            let (schema, table_name) = self.resolve(name)?;
            session.user().check_schema_owner(&schema)?;
            let table = schema
                .find_table_or_view(&table_name)
                .ok_or(DdlError::TableNotFound(table_name))?;
            for user in &users {
                for right in &rights {
                    if grant {
                        user.grant(&table, *right);
                    } else {
                        user.revoke(&table, *right);
                    }
                }
                info!(user = %user.name(), table = %table.name(), grant, "rights changed");
            }
        }
        Ok(0)
    }
}

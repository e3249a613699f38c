//! # Driver
//!
//! Front door of the engine: owns a [`Database`], its users and the index
//! builder, authenticates connections into [`Session`]s and executes SQL on
//! their behalf.

use anyhow::Result;
use auth::{User, UserRef};
use catalog::{Database, DatabaseRef, IndexRef};
use common::{DbConfig, SessionId};
use concurrency::LockMode;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use execution::{DdlContext, DdlError, Session};
use getset::Getters;
use sqlparser::ast::{Ident, ObjectName};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use storage::{CatalogIndexBuilder, IndexManager};
use thiserror::Error;
use tracing::{debug, info, instrument};

pub mod shell;
mod statement;

pub type DriverRef = Arc<Driver>;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("User \"{0}\" already exists")]
    UserAlreadyExists(String),
    #[error("User \"{0}\" not found")]
    UserNotFound(String),
    #[error("Index \"{0}\" not found")]
    IndexNotFound(String),
    #[error("Wrong user name or password")]
    WrongCredentials,
    #[error("Invalid object name \"{0}\"")]
    InvalidName(String),
    #[error("Unknown data type \"{0}\"")]
    UnknownType(String),
    #[error("Feature not supported: {0}")]
    Unsupported(String),
}

#[derive(Debug, Getters)]
pub struct Driver {
    #[getset(get = "pub")]
    config: DbConfig,
    #[getset(get = "pub")]
    database: DatabaseRef,
    #[getset(get = "pub")]
    index_manager: Arc<IndexManager>,
    ddl: DdlContext,
    users: DashMap<String, UserRef>,
    next_session: AtomicU64,
}

impl Driver {
    /// Opens the database described by `config`. The configured user becomes
    /// its administrator.
    pub fn new(config: DbConfig) -> Result<Self> {
        let database = Database::new(&config);
        let index_manager = Arc::new(IndexManager::new());
        let ddl = DdlContext::builder()
            .database(Arc::clone(&database))
            .index_builder(Arc::new(CatalogIndexBuilder::new(Arc::clone(&index_manager))))
            .build();

        let driver = Self {
            config,
            database,
            index_manager,
            ddl,
            users: DashMap::new(),
            next_session: AtomicU64::new(1),
        };
        driver.create_user(driver.config.user(), driver.config.password(), true)?;
        Ok(driver)
    }

    /// Users created with an empty password log in without one. User names
    /// are matched exactly.
    pub fn create_user(&self, name: &str, password: &str, admin: bool) -> Result<UserRef> {
        let name = name.to_string();
        match self.users.entry(name.clone()) {
            Entry::Occupied(_) => Err(DriverError::UserAlreadyExists(name).into()),
            Entry::Vacant(entry) => {
                let user = if password.is_empty() {
                    User::new(name.as_str(), admin)
                } else {
                    User::with_password(name.as_str(), password, admin)?
                };
                let user = Arc::new(user);
                entry.insert(Arc::clone(&user));
                info!(user = %name, admin, "user created");
                Ok(user)
            }
        }
    }

    pub fn find_user(&self, name: &str) -> Option<UserRef> {
        self.users
            .get(name)
            .map(|user| Arc::clone(user.value()))
    }

    /// Authenticates `user` and opens a session for them.
    pub fn connect(&self, user: &str, password: &str) -> Result<Session> {
        let user = self.find_user(user).ok_or(DriverError::WrongCredentials)?;
        user.authenticate(password)
            .map_err(|_| DriverError::WrongCredentials)?;

        let id = SessionId(self.next_session.fetch_add(1, Ordering::SeqCst));
        info!(session = %id, user = %user.name(), "session opened");
        Ok(Session::new(id, user, self.config.lock_timeout()))
    }

    /// Executes every statement in `sql`, stopping at the first failure.
    /// Returns the total number of rows affected.
    #[instrument(skip(self, session), fields(session = %session.id()))]
    pub fn execute(&self, session: &Session, sql: &str) -> Result<u64> {
        let statements = Parser::parse_sql(&GenericDialect {}, sql)?;
        debug!(count = statements.len(), "statements parsed");

        let mut rows = 0;
        for statement in statements {
            rows += self.execute_statement(session, statement)?;
        }
        Ok(rows)
    }

    /// Indexes on the table `name` (`TABLE` or `SCHEMA.TABLE`). Reads under a
    /// shared table lock, so structural changes in flight on the table finish
    /// first.
    pub fn table_indexes(&self, session: &Session, name: &str) -> Result<Vec<IndexRef>> {
        let name = ObjectName(name.split('.').map(Ident::new).collect());
        let (schema, table_name) = self.resolve(&name)?;
        let table = schema
            .find_table_or_view(&table_name)
            .ok_or(DdlError::TableNotFound(table_name))?;

        session.start_statement();
        let _lock = self.lock_table(session, &table, LockMode::Shared)?;
        Ok(table.indexes())
    }
}

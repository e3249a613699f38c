//! `CREATE INDEX`, and the primary keys and unique constraints that lower to it.
//!
//! A request moves through a fixed sequence of steps. Anything that fails
//! before delegation leaves the catalog untouched, and the table lock taken
//! halfway through is released on every exit path by its guard.

use super::{ColumnMapper, CreateIndexSpec, DdlContext, DdlError, IndexTypeRequest, IndexTypeResolver};
use crate::Session;
use auth::AuthorizationGate;
use catalog::{CatalogError, IndexDefinition, NameResolver, SchemaRef};
use common::config::{PREFIX_INDEX, PREFIX_PRIMARY_KEY};
use common::ObjectId;
use concurrency::LockMode;
use std::cell::Cell;
use storage::BuildError;
use tracing::{debug, info, instrument, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Validated,
    Locked,
    Typed,
    Bound,
    Named,
    Delegated,
    Done,
    SkippedExists,
    SkippedNoTable,
}

/// How a successful request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateIndexOutcome {
    Created { id: ObjectId, name: String },
    /// `IF NOT EXISTS` and the name was taken.
    SkippedExists,
    /// `IF EXISTS` on the table and there is no such table.
    SkippedNoTable,
}

/// One `CREATE INDEX` request. Single use: [`CreateIndex::execute`] consumes it.
#[derive(Debug)]
pub struct CreateIndex<'a> {
    session: &'a Session,
    ctx: &'a DdlContext,
    spec: CreateIndexSpec,
    state: Cell<State>,
}

impl<'a> CreateIndex<'a> {
    pub fn new(session: &'a Session, ctx: &'a DdlContext, spec: CreateIndexSpec) -> Self {
        Self {
            session,
            ctx,
            spec,
            state: Cell::new(State::Start),
        }
    }

    #[instrument(
        name = "create_index",
        skip_all,
        fields(session = %self.session.id(), table = %self.spec.table_name())
    )]
    pub fn execute(self) -> Result<CreateIndexOutcome, DdlError> {
        self.session.start_statement();
        let result = self.run();
        if let Err(error) = &result {
            warn!(state = ?self.state.get(), %error, "create index failed");
        }
        result
    }

    fn advance(&self, next: State) {
        trace!(from = ?self.state.get(), to = ?next, "create index");
        self.state.set(next);
    }

    fn skip(&self, state: State, outcome: CreateIndexOutcome) -> Result<CreateIndexOutcome, DdlError> {
        self.advance(state);
        debug!(?outcome, "nothing to do");
        Ok(outcome)
    }

    fn schema(&self) -> Result<SchemaRef, DdlError> {
        let database = self.ctx.database();
        match self.spec.schema_name() {
            Some(name) => database
                .find_schema(name)
                .ok_or_else(|| DdlError::SchemaNotFound(name.clone())),
            None => Ok(database.main_schema()),
        }
    }

    fn run(&self) -> Result<CreateIndexOutcome, DdlError> {
        let spec = &self.spec;
        let database = self.ctx.database();
        let schema = self.schema()?;

        let Some(table) = schema.find_table_or_view(spec.table_name()) else {
            if spec.if_table_exists() {
                return self.skip(State::SkippedNoTable, CreateIndexOutcome::SkippedNoTable);
            }
            return Err(DdlError::TableNotFound(spec.table_name().clone()));
        };

        // Advisory only: the registration below is what actually decides.
        if let Some(name) = spec.index_name() {
            if NameResolver::check_available(&schema, name).is_err() {
                if spec.if_not_exists() {
                    return self.skip(State::SkippedExists, CreateIndexOutcome::SkippedExists);
                }
                return Err(DdlError::IndexAlreadyExists(name.clone()));
            }
        }
        self.advance(State::Validated);

        self.session.user().require_schema_owner_right(&table)?;

        let _lock = table
            .lock(
                self.session.id(),
                LockMode::Exclusive,
                self.session.lock_timeout(),
                self.session.interrupt(),
            )
            .map_err(|error| DdlError::from_lock(error, table.name()))?;
        // The table may have been dropped while this request waited.
        if !schema.contains_table(&table) {
            if spec.if_table_exists() {
                return self.skip(State::SkippedNoTable, CreateIndexOutcome::SkippedNoTable);
            }
            return Err(DdlError::TableNotFound(spec.table_name().clone()));
        }
        self.advance(State::Locked);

        // Table state is only meaningful from here on.
        let index_type = IndexTypeResolver::resolve(
            table.name(),
            &IndexTypeRequest {
                primary_key: spec.primary_key(),
                unique_column_count: spec.unique_column_count(),
                hash: spec.hash(),
                spatial: spec.spatial(),
                persistent_hint: database.persistent(),
                table_persists_indexes: table.is_persist_indexes(),
                table_has_primary_key: table.find_primary_key().is_some(),
            },
        )?;
        self.advance(State::Typed);

        let columns = ColumnMapper::bind(&table, spec.columns())?;
        let unique_column_count = if index_type.is_primary_key() {
            columns.len()
        } else {
            spec.unique_column_count()
        };
        if unique_column_count > columns.len() {
            return Err(DdlError::InvalidIndexType(format!(
                "{unique_column_count} unique columns requested but only {} given",
                columns.len()
            )));
        }
        self.advance(State::Bound);

        // Allocated only now, after typing and binding, so that rejected
        // requests never consume an id.
        let id = database.allocate_object_id();
        // The reservation keeps a generated name away from concurrent
        // generators until the index is registered under it.
        let (name, _reservation) = match spec.index_name() {
            Some(name) => (name.clone(), None),
            None => {
                let prefix = if index_type.is_primary_key() {
                    PREFIX_PRIMARY_KEY
                } else {
                    PREFIX_INDEX
                };
                let reservation = NameResolver::unique_name(&schema, &table, prefix);
                (reservation.as_str().to_string(), Some(reservation))
            }
        };
        self.advance(State::Named);

        let definition = IndexDefinition::builder()
            .id(id)
            .name(name.as_str())
            .columns(columns)
            .unique_column_count(unique_column_count)
            .index_type(index_type)
            .comment(spec.comment().clone())
            .build();
        match self.ctx.index_builder().build(&schema, &table, definition) {
            Ok(_) => self.advance(State::Delegated),
            Err(BuildError::Catalog(CatalogError::NameConflict(_))) if spec.if_not_exists() => {
                return self.skip(State::SkippedExists, CreateIndexOutcome::SkippedExists);
            }
            Err(error) => return Err(error.into()),
        }

        self.advance(State::Done);
        info!(%id, index = %name, %index_type, "index created");
        Ok(CreateIndexOutcome::Created { id, name })
    }
}

/// Runs one `CREATE INDEX` request on behalf of `session`.
///
/// Structural statements affect no rows, so success is always `Ok(0)`.
pub fn create_index(
    session: &Session,
    ctx: &DdlContext,
    spec: CreateIndexSpec,
) -> Result<u64, DdlError> {
    CreateIndex::new(session, ctx, spec).execute().map(|_| 0)
}

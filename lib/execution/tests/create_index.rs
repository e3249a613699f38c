use auth::{Right, User};
use catalog::{Column, Database, DatabaseRef, IndexColumn, IndexKind, SortOrder, TableDefinition, TableRef};
use common::{DbConfig, SessionId, StorageMode};
use concurrency::LockMode;
use execution::{create_index, CreateIndexSpec, DdlContext, DdlError, Session};
use pretty_assertions_sorted::assert_eq;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use storage::CatalogIndexBuilder;
use ty::DataTypeKind;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

struct Fixture {
    ctx: DdlContext,
    table: TableRef,
}

impl Fixture {
    fn new(mode: StorageMode) -> Self {
        let database = Database::new(&DbConfig::builder().database("test").mode(mode).build());
        let table = create_table(&database, "T", false);
        let ctx = DdlContext::builder()
            .database(database)
            .index_builder(Arc::new(CatalogIndexBuilder::default()))
            .build();
        Self { ctx, table }
    }

    fn database(&self) -> &DatabaseRef {
        self.ctx.database()
    }

    fn session(&self, user: User) -> Session {
        session(user, Duration::from_millis(200))
    }

    fn owner(&self) -> Session {
        self.session(User::new("sa", false))
    }

    fn index_count(&self) -> usize {
        self.database().main_schema().indexes().len()
    }
}

fn session(user: User, lock_timeout: Duration) -> Session {
    Session::new(
        SessionId(NEXT_SESSION.fetch_add(1, Ordering::SeqCst)),
        Arc::new(user),
        lock_timeout,
    )
}

fn create_table(database: &DatabaseRef, name: &str, temporary: bool) -> TableRef {
    database
        .create_table(
            &database.main_schema(),
            TableDefinition::builder()
                .name(name)
                .columns(vec![
                    Column::new("A", DataTypeKind::Integer),
                    Column::new("B", DataTypeKind::Integer),
                ])
                .temporary(temporary)
                .build(),
        )
        .unwrap()
}

fn on(columns: &[&str]) -> Vec<IndexColumn> {
    columns.iter().map(|name| IndexColumn::new(*name)).collect()
}

#[test]
fn primary_key_gets_generated_name_and_full_unique_count() {
    let fixture = Fixture::new(StorageMode::Persistent);
    let session = fixture.owner();

    let rows = create_index(
        &session,
        &fixture.ctx,
        CreateIndexSpec::builder()
            .table_name("T")
            .columns(on(&["A"]))
            .primary_key(true)
            .build(),
    )
    .unwrap();

    assert_eq!(rows, 0);
    let pk = fixture.table.find_primary_key().unwrap();
    assert_eq!(pk.name(), "PRIMARY_KEY_1");
    assert_eq!(pk.unique_column_count(), 1);
    assert_eq!(pk.index_type().kind(), IndexKind::PrimaryKey);
    assert!(pk.index_type().is_persistent());
    assert!(!fixture.table.find_column("A").unwrap().1.nullable());
}

#[test]
fn second_primary_key_fails_regardless_of_columns() {
    let fixture = Fixture::new(StorageMode::Persistent);
    let session = fixture.owner();
    let pk = |columns: &[&str]| {
        CreateIndexSpec::builder()
            .table_name("T")
            .columns(on(columns))
            .primary_key(true)
            .build()
    };

    create_index(&session, &fixture.ctx, pk(&["A"])).unwrap();

    for columns in [&["A"][..], &["B"][..], &["A", "B"][..]] {
        assert_eq!(
            create_index(&session, &fixture.ctx, pk(columns)),
            Err(DdlError::DuplicatePrimaryKey("T".into()))
        );
    }
    assert_eq!(fixture.index_count(), 1);
}

#[test]
fn repeated_name_with_if_not_exists_is_a_no_op() {
    let fixture = Fixture::new(StorageMode::Persistent);
    let session = fixture.owner();
    let spec = |if_not_exists: bool| {
        CreateIndexSpec::builder()
            .table_name("T")
            .index_name(Some("IDX1".to_string()))
            .columns(on(&["B"]))
            .hash(true)
            .if_not_exists(if_not_exists)
            .build()
    };

    assert_eq!(create_index(&session, &fixture.ctx, spec(false)), Ok(0));
    let first = fixture.database().main_schema().find_index("IDX1").unwrap();
    assert!(first.index_type().is_hash());

    assert_eq!(create_index(&session, &fixture.ctx, spec(true)), Ok(0));
    assert_eq!(
        create_index(&session, &fixture.ctx, spec(false)),
        Err(DdlError::IndexAlreadyExists("IDX1".into()))
    );

    assert_eq!(fixture.index_count(), 1);
    assert_eq!(fixture.table.indexes().len(), 1);
    assert_eq!(
        fixture.database().main_schema().find_index("IDX1").unwrap().id(),
        first.id()
    );
}

#[test]
fn missing_table() {
    let fixture = Fixture::new(StorageMode::Persistent);
    let session = fixture.owner();
    let spec = |if_table_exists: bool| {
        CreateIndexSpec::builder()
            .table_name("MISSING")
            .columns(on(&["A"]))
            .if_table_exists(if_table_exists)
            .build()
    };

    assert_eq!(create_index(&session, &fixture.ctx, spec(true)), Ok(0));
    assert_eq!(
        create_index(&session, &fixture.ctx, spec(false)),
        Err(DdlError::TableNotFound("MISSING".into()))
    );
    assert_eq!(fixture.index_count(), 0);
}

#[test]
fn missing_schema() {
    let fixture = Fixture::new(StorageMode::Persistent);
    let result = create_index(
        &fixture.owner(),
        &fixture.ctx,
        CreateIndexSpec::builder()
            .schema_name(Some("NOPE".to_string()))
            .table_name("T")
            .columns(on(&["A"]))
            .build(),
    );
    assert_eq!(result, Err(DdlError::SchemaNotFound("NOPE".into())));
}

#[test]
fn unresolved_column_registers_nothing() {
    let fixture = Fixture::new(StorageMode::Persistent);
    let result = create_index(
        &fixture.owner(),
        &fixture.ctx,
        CreateIndexSpec::builder()
            .table_name("T")
            .index_name(Some("IDX".to_string()))
            .columns(on(&["A", "Z"]))
            .build(),
    );

    assert_eq!(
        result,
        Err(DdlError::UnresolvedColumn {
            column: "Z".into(),
            table: "T".into()
        })
    );
    assert_eq!(fixture.index_count(), 0);
    assert!(fixture.table.indexes().is_empty());
}

#[test]
fn rejected_requests_consume_no_object_ids() {
    let fixture = Fixture::new(StorageMode::Persistent);
    let session = fixture.owner();
    let spec = |column: &str| {
        CreateIndexSpec::builder()
            .table_name("T")
            .index_name(Some("IDX".to_string()))
            .columns(on(&[column]))
            .build()
    };
    let before = fixture.database().allocate_object_id();

    for _ in 0..3 {
        assert!(create_index(&session, &fixture.ctx, spec("Z")).is_err());
    }
    create_index(&session, &fixture.ctx, spec("A")).unwrap();

    let index = fixture.database().main_schema().find_index("IDX").unwrap();
    assert_eq!(index.id().0, before.0 + 1);
}

#[test]
fn unique_index_keeps_included_columns() {
    let fixture = Fixture::new(StorageMode::Persistent);
    create_index(
        &fixture.owner(),
        &fixture.ctx,
        CreateIndexSpec::builder()
            .table_name("T")
            .index_name(Some("UQ".to_string()))
            .columns(vec![
                IndexColumn::new("B").with_sort_order(SortOrder::descending()),
                IndexColumn::new("A"),
            ])
            .unique_column_count(1)
            .comment(Some("lookup by b".to_string()))
            .build(),
    )
    .unwrap();

    let index = fixture.database().main_schema().find_index("UQ").unwrap();
    assert_eq!(index.unique_column_count(), 1);
    assert_eq!(index.included_columns().len(), 1);
    assert_eq!(index.comment().as_deref(), Some("lookup by b"));
    assert_eq!(index.to_string(), "UNIQUE INDEX UQ ON PUBLIC.T(B DESC, A)");
}

#[test]
fn permission_denied_without_schema_owner_right() {
    let fixture = Fixture::new(StorageMode::Persistent);
    let spec = || {
        CreateIndexSpec::builder()
            .table_name("T")
            .columns(on(&["A"]))
            .build()
    };

    let alice = User::new("alice", false);
    alice.grant(&fixture.table, Right::Select);
    let session = fixture.session(alice);
    assert!(matches!(
        create_index(&session, &fixture.ctx, spec()),
        Err(DdlError::PermissionDenied(_))
    ));
    assert_eq!(fixture.index_count(), 0);

    session.user().grant(&fixture.table, Right::SchemaOwner);
    assert_eq!(create_index(&session, &fixture.ctx, spec()), Ok(0));
}

#[test]
fn transient_when_database_or_table_does_not_persist() {
    let memory = Fixture::new(StorageMode::Memory);
    create_index(
        &memory.owner(),
        &memory.ctx,
        CreateIndexSpec::builder()
            .table_name("T")
            .columns(on(&["A"]))
            .build(),
    )
    .unwrap();
    assert!(!memory.table.indexes()[0].index_type().is_persistent());

    let persistent = Fixture::new(StorageMode::Persistent);
    let temporary = create_table(persistent.database(), "TMP", true);
    create_index(
        &persistent.owner(),
        &persistent.ctx,
        CreateIndexSpec::builder()
            .table_name("TMP")
            .columns(on(&["A"]))
            .primary_key(true)
            .build(),
    )
    .unwrap();
    assert!(!temporary.find_primary_key().unwrap().index_type().is_persistent());
}

#[test]
fn persistence_is_read_after_locking() {
    let fixture = Fixture::new(StorageMode::Persistent);
    let holder = fixture.owner();
    let guard = fixture
        .table
        .lock(holder.id(), LockMode::Exclusive, Duration::from_secs(1), holder.interrupt())
        .unwrap();

    let ctx = fixture.ctx.clone();
    let session = session(User::new("sa", false), Duration::from_secs(5));
    let waiter_id = session.id();
    let waiter = thread::spawn(move || {
        create_index(
            &session,
            &ctx,
            CreateIndexSpec::builder()
                .table_name("T")
                .columns(on(&["A"]))
                .build(),
        )
    });

    // Flip the table's policy while the other session waits for the lock.
    while fixture
        .database()
        .lock_coordinator()
        .waiting_on(waiter_id)
        .is_none()
    {
        thread::sleep(Duration::from_millis(1));
    }
    fixture.table.set_persist_indexes(false);
    drop(guard);

    assert_eq!(waiter.join().unwrap(), Ok(0));
    assert!(!fixture.table.indexes()[0].index_type().is_persistent());
}

#[test]
fn lock_timeout_when_another_session_holds_the_table() {
    let fixture = Fixture::new(StorageMode::Persistent);
    let holder = fixture.owner();
    let _guard = fixture
        .table
        .lock(holder.id(), LockMode::Exclusive, Duration::from_secs(1), holder.interrupt())
        .unwrap();

    let result = create_index(
        &fixture.owner(),
        &fixture.ctx,
        CreateIndexSpec::builder()
            .table_name("T")
            .columns(on(&["A"]))
            .build(),
    );

    assert!(matches!(result, Err(DdlError::LockTimeout { ref table, .. }) if table == "T"));
    assert_eq!(fixture.index_count(), 0);
}

#[test]
fn cancelled_while_waiting_for_the_lock() {
    let fixture = Fixture::new(StorageMode::Persistent);
    let holder = fixture.owner();
    let _guard = fixture
        .table
        .lock(holder.id(), LockMode::Exclusive, Duration::from_secs(1), holder.interrupt())
        .unwrap();

    let session = Arc::new(session(User::new("sa", false), Duration::from_secs(30)));
    let canceller = {
        let session = Arc::clone(&session);
        let coordinator = Arc::clone(fixture.database().lock_coordinator());
        thread::spawn(move || {
            while coordinator.waiting_on(session.id()).is_none() {
                thread::sleep(Duration::from_millis(1));
            }
            session.cancel();
        })
    };

    let result = create_index(
        &session,
        &fixture.ctx,
        CreateIndexSpec::builder()
            .table_name("T")
            .columns(on(&["A"]))
            .build(),
    );
    canceller.join().unwrap();

    assert_eq!(result, Err(DdlError::Interrupted("T".into())));
    assert_eq!(fixture.index_count(), 0);
}

#[test]
fn concurrent_creation_with_one_name_has_one_winner() {
    for if_not_exists in [false, true] {
        let fixture = Fixture::new(StorageMode::Persistent);
        let second = create_table(fixture.database(), "U", false);
        let barrier = Arc::new(Barrier::new(2));

        // Different tables, so the table locks do not serialize the two.
        let handles: Vec<_> = ["T", "U"]
            .into_iter()
            .map(|table| {
                let ctx = fixture.ctx.clone();
                let barrier = Arc::clone(&barrier);
                let session = fixture.owner();
                thread::spawn(move || {
                    barrier.wait();
                    create_index(
                        &session,
                        &ctx,
                        CreateIndexSpec::builder()
                            .table_name(table)
                            .index_name(Some("SHARED".to_string()))
                            .columns(on(&["A"]))
                            .if_not_exists(if_not_exists)
                            .build(),
                    )
                })
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        let winners = results.iter().filter(|result| result.is_ok()).count();
        if if_not_exists {
            assert_eq!(winners, 2);
        } else {
            assert_eq!(winners, 1);
            assert!(results
                .iter()
                .any(|result| result == &Err(DdlError::IndexAlreadyExists("SHARED".into()))));
        }
        assert_eq!(fixture.index_count(), 1);
        assert_eq!(fixture.table.indexes().len() + second.indexes().len(), 1);
    }
}

#[test]
fn concurrent_generated_names_do_not_collide() {
    let fixture = Fixture::new(StorageMode::Persistent);
    let tables: Vec<_> = (0..4)
        .map(|n| create_table(fixture.database(), &format!("W{n}"), false))
        .collect();
    let barrier = Arc::new(Barrier::new(tables.len()));

    let handles: Vec<_> = tables
        .iter()
        .map(|table| {
            let ctx = fixture.ctx.clone();
            let barrier = Arc::clone(&barrier);
            let session = fixture.owner();
            let table = table.name().clone();
            thread::spawn(move || {
                barrier.wait();
                create_index(
                    &session,
                    &ctx,
                    CreateIndexSpec::builder()
                        .table_name(table)
                        .columns(on(&["B"]))
                        .build(),
                )
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(0));
    }

    let mut names: Vec<_> = fixture
        .database()
        .main_schema()
        .indexes()
        .iter()
        .map(|index| index.name().clone())
        .collect();
    names.sort();
    assert_eq!(names, vec!["INDEX_1", "INDEX_2", "INDEX_3", "INDEX_4"]);
}

#[test]
fn table_dropped_while_waiting_for_the_lock() {
    for if_table_exists in [false, true] {
        let fixture = Fixture::new(StorageMode::Persistent);
        let schema = fixture.database().main_schema();
        let dropper = fixture.owner();
        let guard = fixture
            .table
            .lock(dropper.id(), LockMode::Exclusive, Duration::from_secs(1), dropper.interrupt())
            .unwrap();

        let ctx = fixture.ctx.clone();
        let session = session(User::new("sa", false), Duration::from_secs(5));
        let waiter_id = session.id();
        let waiter = thread::spawn(move || {
            create_index(
                &session,
                &ctx,
                CreateIndexSpec::builder()
                    .table_name("T")
                    .index_name(Some("IDX".to_string()))
                    .columns(on(&["A"]))
                    .if_table_exists(if_table_exists)
                    .build(),
            )
        });

        while fixture
            .database()
            .lock_coordinator()
            .waiting_on(waiter_id)
            .is_none()
        {
            thread::sleep(Duration::from_millis(1));
        }
        fixture.database().drop_table(&schema, &fixture.table).unwrap();
        drop(guard);

        let expected = if if_table_exists {
            Ok(0)
        } else {
            Err(DdlError::TableNotFound("T".into()))
        };
        assert_eq!(waiter.join().unwrap(), expected);
        assert!(schema.find_index("IDX").is_none());
        assert!(fixture.table.indexes().is_empty());
    }
}

#[test]
fn cancelling_an_idle_session_does_not_affect_its_next_statement() {
    let fixture = Fixture::new(StorageMode::Persistent);
    let session = fixture.owner();
    session.cancel();

    for column in ["A", "B"] {
        assert_eq!(
            create_index(
                &session,
                &fixture.ctx,
                CreateIndexSpec::builder()
                    .table_name("T")
                    .columns(on(&[column]))
                    .build(),
            ),
            Ok(0)
        );
    }
    assert_eq!(fixture.index_count(), 2);
}

#[test]
fn cancellation_before_the_statement_is_forgotten_when_it_waits() {
    let fixture = Fixture::new(StorageMode::Persistent);
    let holder = fixture.owner();
    let _guard = fixture
        .table
        .lock(holder.id(), LockMode::Exclusive, Duration::from_secs(1), holder.interrupt())
        .unwrap();

    let session = session(User::new("sa", false), Duration::from_millis(50));
    session.cancel();
    let result = create_index(
        &session,
        &fixture.ctx,
        CreateIndexSpec::builder()
            .table_name("T")
            .columns(on(&["A"]))
            .build(),
    );

    assert!(matches!(result, Err(DdlError::LockTimeout { .. })));
}

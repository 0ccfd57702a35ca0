#![allow(dead_code)]

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use rowkeep_core::db::{DbResult, Migration, SqliteStoreFactory, StoreFactory};
use rowkeep_core::repo::StoreHandle;
use rowkeep_core::{
    Entity, FieldTable, ModelStore, StoreConfig, StoreContext, TransactionCoordinator, View,
    ViewProjector,
};
use rusqlite::Connection;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub const USER_SCHEMA: &[Migration] = &[Migration::new(
    1,
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL CHECK (length(name) > 0),
        age INTEGER,
        joined_at TEXT
    );",
)];

#[derive(Debug, Default, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub age: Option<i64>,
    pub joined_at: Option<NaiveDateTime>,
}

static USER_FIELDS: Lazy<FieldTable<User>> = Lazy::new(|| {
    FieldTable::builder("users")
        .generated_key("id", |u: &User| u.id, |u: &mut User, v| u.id = v)
        .field("name", |u: &User| u.name.clone(), |u: &mut User, v| u.name = v)
        .field("age", |u: &User| u.age, |u: &mut User, v| u.age = v)
        .field("joined_at", |u: &User| u.joined_at, |u: &mut User, v| u.joined_at = v)
        .build()
});

impl Entity for User {
    fn field_table() -> &'static FieldTable<Self> {
        &USER_FIELDS
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserView {
    pub user: User,
    /// Rows in `users` when the view was built; only set by rich projectors.
    pub peers: Option<i64>,
}

impl View for UserView {
    type Record = User;

    fn record(&self) -> &User {
        &self.user
    }

    fn record_mut(&mut self) -> &mut User {
        &mut self.user
    }
}

pub fn user(name: &str, age: Option<i64>) -> UserView {
    UserView {
        user: User {
            name: name.to_string(),
            age,
            ..User::default()
        },
        peers: None,
    }
}

pub fn plain_projector() -> ViewProjector<UserView> {
    ViewProjector::plain(|user: User| UserView { user, peers: None })
}

pub fn counting_projector() -> ViewProjector<UserView> {
    ViewProjector::rich(|user: User, context: &StoreContext| {
        let peers: i64 =
            context
                .connection()
                .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(UserView {
            user,
            peers: Some(peers),
        })
    })
}

/// Wraps `SqliteStoreFactory` and counts handle lifecycle and transaction
/// outcomes through SQLite's commit/rollback hooks.
#[derive(Debug)]
pub struct CountingFactory {
    inner: SqliteStoreFactory,
    opens: AtomicUsize,
    releases: AtomicUsize,
    commits: Arc<AtomicUsize>,
    rollbacks: Arc<AtomicUsize>,
}

impl CountingFactory {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

impl StoreFactory for CountingFactory {
    fn open(&self, entity: &'static str) -> DbResult<Connection> {
        let conn = self.inner.open(entity)?;
        let commits = Arc::clone(&self.commits);
        conn.commit_hook(Some(move || {
            commits.fetch_add(1, Ordering::SeqCst);
            false
        }));
        let rollbacks = Arc::clone(&self.rollbacks);
        conn.rollback_hook(Some(move || {
            rollbacks.fetch_add(1, Ordering::SeqCst);
        }));
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(conn)
    }

    fn release(&self, handle: &StoreHandle) {
        self.inner.release(handle);
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub factory: Arc<CountingFactory>,
    pub coordinator: TransactionCoordinator,
    pub store: ModelStore<UserView>,
}

pub fn setup() -> Fixture {
    setup_with(plain_projector())
}

pub fn setup_with(projector: ViewProjector<UserView>) -> Fixture {
    setup_configured(projector, |_| {})
}

/// Like `setup_with`, letting the caller adjust the store config first.
pub fn setup_configured(
    projector: ViewProjector<UserView>,
    configure: impl FnOnce(&mut StoreConfig),
) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let mut config = StoreConfig::at(dir.path().join("rowkeep.db"));
    configure(&mut config);
    let inner = SqliteStoreFactory::new(config, USER_SCHEMA).unwrap();
    let factory = Arc::new(CountingFactory {
        inner,
        opens: AtomicUsize::new(0),
        releases: AtomicUsize::new(0),
        commits: Arc::new(AtomicUsize::new(0)),
        rollbacks: Arc::new(AtomicUsize::new(0)),
    });
    let coordinator = TransactionCoordinator::new(factory.clone());
    let store = ModelStore::new(coordinator.clone(), projector);

    Fixture {
        dir,
        factory,
        coordinator,
        store,
    }
}

/// Inserts `names` with ages 20, 21, ... and returns the stored users.
pub fn seed(fixture: &Fixture, names: &[&str]) -> Vec<User> {
    names
        .iter()
        .zip(20..)
        .map(|(name, age)| {
            fixture
                .store
                .create_blocking(user(name, Some(age)), None)
                .data
                .unwrap()
                .user
        })
        .collect()
}

/// Opens a connection outside the repository, e.g. to hold locks.
pub fn raw_connection(fixture: &Fixture) -> Connection {
    Connection::open(fixture.dir.path().join("rowkeep.db")).unwrap()
}

/// Installs a trigger that makes deleting the user named `name` fail.
pub fn protect_from_delete(fixture: &Fixture, name: &str) {
    raw_connection(fixture)
        .execute_batch(&format!(
            "CREATE TRIGGER keep_{name} BEFORE DELETE ON users WHEN old.name = '{name}'
             BEGIN SELECT RAISE(ABORT, '{name} is protected'); END;"
        ))
        .unwrap();
}

/// Reads a row directly, bypassing the repository.
pub fn raw_user(fixture: &Fixture, id: i64) -> Option<(String, Option<i64>, Option<String>)> {
    raw_connection(fixture)
        .query_row(
            "SELECT name, age, joined_at FROM users WHERE id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .ok()
}

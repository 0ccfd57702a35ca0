mod common;

use common::USER_SCHEMA;
use rowkeep_core::db::migrations::latest_version;
use rowkeep_core::db::{open_db, DbError, Migration, SqliteStoreFactory};
use rowkeep_core::{JournalMode, StoreConfig};
use rusqlite::Connection;

#[test]
fn factory_applies_all_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::at(dir.path().join("rowkeep.db"));

    SqliteStoreFactory::new(config.clone(), USER_SCHEMA).unwrap();

    let conn = Connection::open(&config.path).unwrap();
    assert_eq!(schema_version(&conn), latest_version(USER_SCHEMA));
    assert_table_exists(&conn, "users");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::at(dir.path().join("rowkeep.db"));

    let conn_first = open_db(&config, USER_SCHEMA).unwrap();
    assert_eq!(schema_version(&conn_first), 1);
    drop(conn_first);

    let conn_second = open_db(&config, USER_SCHEMA).unwrap();
    assert_eq!(schema_version(&conn_second), 1);
    assert_table_exists(&conn_second, "users");
}

#[test]
fn later_migrations_apply_on_top_of_existing_schema() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::at(dir.path().join("rowkeep.db"));
    open_db(&config, USER_SCHEMA).unwrap();

    let extended = [
        USER_SCHEMA[0],
        Migration::new(2, "CREATE TABLE teams (id INTEGER PRIMARY KEY, title TEXT);"),
    ];
    let conn = open_db(&config, &extended).unwrap();

    assert_eq!(schema_version(&conn), 2);
    assert_table_exists(&conn, "teams");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&StoreConfig::at(&path), USER_SCHEMA).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn connection_pragmas_follow_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        journal_mode: JournalMode::Delete,
        foreign_keys: false,
        ..StoreConfig::at(dir.path().join("rowkeep.db"))
    };

    let conn = open_db(&config, USER_SCHEMA).unwrap();

    let journal: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal.to_ascii_lowercase(), "delete");
    assert_eq!(foreign_keys, 0);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Accept entity schemas as ordered migrations supplied by the embedding app.
//! - Apply pending migrations atomically.
//!
//! # Invariants
//! - `version` values must remain strictly increasing.
//! - Applied migration version is mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// One schema step owned by the embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: u32,
    pub sql: &'static str,
}

impl Migration {
    pub const fn new(version: u32, sql: &'static str) -> Self {
        Self { version, sql }
    }
}

/// Returns the latest migration version in `migrations`.
pub fn latest_version(migrations: &[Migration]) -> u32 {
    migrations.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection, migrations: &[Migration]) -> DbResult<()> {
    ensure_ordered(migrations)?;

    let current_version = current_user_version(conn)?;
    let latest = latest_version(migrations);

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in migrations {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        current_version, latest
    );
    Ok(())
}

/// Reads the schema version recorded on `conn`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn ensure_ordered(migrations: &[Migration]) -> DbResult<()> {
    for pair in migrations.windows(2) {
        if pair[1].version <= pair[0].version {
            return Err(DbError::UnorderedMigrations {
                previous: pair[0].version,
                next: pair[1].version,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, Migration};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn latest_version_of_empty_list_is_zero() {
        assert_eq!(latest_version(&[]), 0);
    }

    #[test]
    fn unordered_migrations_are_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        let migrations = [
            Migration::new(2, "CREATE TABLE a (id INTEGER);"),
            Migration::new(1, "CREATE TABLE b (id INTEGER);"),
        ];

        let err = apply_migrations(&mut conn, &migrations).unwrap_err();
        assert!(matches!(
            err,
            DbError::UnorderedMigrations {
                previous: 2,
                next: 1
            }
        ));
    }

    #[test]
    fn pending_migrations_only_run_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        let migrations = [Migration::new(1, "CREATE TABLE a (id INTEGER);")];

        apply_migrations(&mut conn, &migrations).unwrap();
        apply_migrations(&mut conn, &migrations).unwrap();

        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}

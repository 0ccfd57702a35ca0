//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file-backed SQLite connections from a `StoreConfig`.
//! - Configure connection pragmas required by repository behavior.
//! - Trigger schema migrations when asked to.
//!
//! # Invariants
//! - Returned connections honor `StoreConfig::foreign_keys`.
//! - Connections returned by `open_db` have migrations fully applied.

use super::migrations::{apply_migrations, Migration};
use super::DbResult;
use crate::config::StoreConfig;
use log::{error, info};
use rusqlite::Connection;
use std::time::Instant;

/// Opens the configured database file and applies all pending migrations.
///
/// # Side effects
/// - Performs connection bootstrap and migration checks.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(config: &StoreConfig, migrations: &[Migration]) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mut conn = open_db_with(config)?;

    match apply_migrations(&mut conn, migrations) {
        Ok(()) => Ok(conn),
        Err(err) => {
            error!(
                "event=db_open module=db status=error duration_ms={} error_code=db_migrate_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Opens the configured database file without touching its schema.
///
/// Used for every per-scope store handle once the factory has migrated the
/// schema.
pub fn open_db_with(config: &StoreConfig) -> DbResult<Connection> {
    let started_at = Instant::now();

    let conn = match Connection::open(&config.path) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error path={} duration_ms={} error_code=db_open_failed error={}",
                config.path.display(),
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&conn, config) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok path={} duration_ms={}",
                config.path.display(),
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error path={} duration_ms={} error_code=db_bootstrap_failed error={}",
                config.path.display(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &Connection, config: &StoreConfig) -> DbResult<()> {
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!(
        "PRAGMA foreign_keys = {foreign_keys};
         PRAGMA journal_mode = {};",
        config.journal_mode.as_pragma()
    ))?;
    conn.busy_timeout(config.busy_timeout())?;
    Ok(())
}

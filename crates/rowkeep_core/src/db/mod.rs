//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the repository engine.
//! - Apply caller-supplied schema migrations in deterministic order.
//! - Hand out fresh store handles through the `StoreFactory` seam.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No repository operation touches a database before migrations succeed.

use thiserror::Error;

mod factory;
pub mod migrations;
mod open;

pub use factory::{SqliteStoreFactory, StoreFactory};
pub use migrations::Migration;
pub use open::{open_db, open_db_with};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error(
        "database schema version {db_version} is newer than supported {latest_supported}"
    )]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    #[error("migration versions must be strictly increasing, found {previous} then {next}")]
    UnorderedMigrations { previous: u32, next: u32 },
}

//! Store-handle factory seam.
//!
//! # Responsibility
//! - Create a fresh connection for every root transactional scope.
//! - Observe handles being disposed once their owning scope has ended.

use super::migrations::Migration;
use super::open::{open_db, open_db_with};
use super::DbResult;
use crate::config::StoreConfig;
use crate::repo::StoreHandle;
use log::debug;
use rusqlite::Connection;

/// Creates and disposes store handles on behalf of root scopes.
///
/// Joined scopes never reach the factory; only the owning call opens and
/// releases.
pub trait StoreFactory: Send + Sync {
    /// Opens a new connection for work against `entity`.
    fn open(&self, entity: &'static str) -> DbResult<Connection>;

    /// Called once per root handle right before its connection closes.
    fn release(&self, _handle: &StoreHandle) {}
}

/// File-backed factory that migrates the schema once, then opens one
/// configured connection per root scope.
#[derive(Debug, Clone)]
pub struct SqliteStoreFactory {
    config: StoreConfig,
}

impl SqliteStoreFactory {
    /// Applies `migrations` to the configured database and returns a factory
    /// for it.
    pub fn new(config: StoreConfig, migrations: &[Migration]) -> DbResult<Self> {
        let conn = open_db(&config, migrations)?;
        drop(conn);
        Ok(Self { config })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl StoreFactory for SqliteStoreFactory {
    fn open(&self, entity: &'static str) -> DbResult<Connection> {
        debug!("event=store_open module=db status=start entity={entity}");
        open_db_with(&self.config)
    }

    fn release(&self, handle: &StoreHandle) {
        debug!(
            "event=store_release module=db status=ok handle={}",
            handle.id()
        );
    }
}

//! Generic data-access repository engine over SQLite.
//!
//! Every repository operation reports through an [`Outcome`] envelope and runs
//! inside a transactional scope that is either owned (root) or joined.

pub mod config;
pub mod db;
pub mod field;
pub mod logging;
pub mod model;
pub mod repo;
pub mod view;

pub use config::{JournalMode, LogConfig, StoreConfig};
pub use db::{DbError, DbResult, Migration, SqliteStoreFactory, StoreFactory};
pub use field::{Comparison, Entity, FieldKind, FieldTable, FieldType, FieldValue, Filter};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{
    ErrorInfo, ErrorKind, FieldPatch, Outcome, PageQuery, PageResult, SortDirection,
};
pub use repo::{
    FaultSink, FieldPatcher, LogFaultSink, ModelStore, NoopFaultSink, QueryPager, RepoError,
    RepoResult, ScopeIntent, ScopeLease, ScopeOwnership, SortFallback, StoreContext,
    TransactionCoordinator,
};
pub use view::{View, ViewProjector};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

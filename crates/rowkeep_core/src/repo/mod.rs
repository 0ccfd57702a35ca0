//! Generic repository engine.
//!
//! # Responsibility
//! - Coordinate transactional scopes across nested repository calls.
//! - Provide CRUD, existence, aggregate, paging and patch operations for any
//!   `Entity`, each in an async and a blocking flavor.
//!
//! # Invariants
//! - Every operation acquires or joins exactly once through
//!   `TransactionCoordinator`.
//! - Only the call that opened a scope commits, rolls back or disposes it.
//! - Operations return `Outcome`, never a raw error (the boolean `exists`
//!   probe aside).

mod coordinator;
mod error;
mod fault;
mod model_store;
mod pager;
mod patcher;
mod scope;
pub(crate) mod sql;

pub use coordinator::TransactionCoordinator;
pub use error::{RepoError, RepoResult};
pub use fault::{FaultSink, LogFaultSink, NoopFaultSink};
pub use model_store::ModelStore;
pub use pager::{QueryPager, SortFallback};
pub use patcher::FieldPatcher;
pub use scope::{
    ScopeIntent, ScopeLease, ScopeOwnership, ScopeState, StoreContext, StoreHandle,
    TransactionScope,
};

//! Transaction ownership protocol.
//!
//! # Responsibility
//! - Decide, once per operation, whether to open a root scope or join the
//!   caller's.
//! - Finalize only owned scopes and turn faults into failure outcomes.
//!
//! # Invariants
//! - `acquire_or_join` is the single ownership decision point.
//! - Joined scopes are never committed, rolled back or released here.
//! - Every fault reaches the `FaultSink` exactly once.

use super::fault::{FaultSink, NoopFaultSink};
use super::scope::{ScopeIntent, ScopeLease, StoreContext};
use super::{RepoError, RepoResult};
use crate::db::StoreFactory;
use crate::model::{ErrorInfo, Outcome};
use log::debug;
use std::sync::Arc;

/// Shared by every store, pager and patcher built on the same factory.
#[derive(Clone)]
pub struct TransactionCoordinator {
    factory: Arc<dyn StoreFactory>,
    faults: Arc<dyn FaultSink>,
}

impl TransactionCoordinator {
    pub fn new(factory: Arc<dyn StoreFactory>) -> Self {
        Self {
            factory,
            faults: Arc::new(NoopFaultSink),
        }
    }

    pub fn with_fault_sink(mut self, faults: Arc<dyn FaultSink>) -> Self {
        self.faults = faults;
        self
    }

    /// Opens a root write scope the caller threads through several operations
    /// and finalizes once with `ScopeLease::complete`.
    pub fn begin(&self, entity: &'static str) -> RepoResult<ScopeLease<'static>> {
        self.begin_with(entity, ScopeIntent::Write)
    }

    /// Opens a root scope for `intent`.
    pub fn begin_with(
        &self,
        entity: &'static str,
        intent: ScopeIntent,
    ) -> RepoResult<ScopeLease<'static>> {
        let conn = self.factory.open(entity)?;
        let context = StoreContext::open(conn, intent, self.factory.as_ref())?;
        Ok(ScopeLease::root(context, Arc::clone(&self.factory)))
    }

    /// Joins `existing` verbatim, or opens a new root write scope when absent.
    pub fn acquire_or_join<'a>(
        &self,
        entity: &'static str,
        existing: Option<&'a StoreContext>,
    ) -> RepoResult<ScopeLease<'a>> {
        self.acquire_or_join_for(entity, existing, ScopeIntent::Write)
    }

    /// Like `acquire_or_join`; `intent` only applies when a root is opened.
    pub fn acquire_or_join_for<'a>(
        &self,
        entity: &'static str,
        existing: Option<&'a StoreContext>,
        intent: ScopeIntent,
    ) -> RepoResult<ScopeLease<'a>> {
        match existing {
            Some(context) => Ok(ScopeLease::joined(context)),
            None => self.begin_with(entity, intent),
        }
    }

    /// Commits or rolls back `lease` when it is the root; no-op when joined.
    pub fn finalize(&self, lease: &ScopeLease<'_>, succeeded: bool) -> RepoResult<()> {
        lease.finalize(succeeded)
    }

    /// Rolls back an owned scope, reports the fault and builds the failure.
    pub fn handle_fault<T>(
        &self,
        operation: &'static str,
        entity: &'static str,
        error: RepoError,
        lease: Option<&ScopeLease<'_>>,
    ) -> Outcome<T> {
        if let Some(lease) = lease {
            lease.abort();
        }
        self.report(operation, entity, &error);
        Outcome::failure(ErrorInfo::from(&error))
    }

    /// Finalizes `lease` according to `result` and wraps it in an `Outcome`.
    pub(crate) fn conclude<T>(
        &self,
        operation: &'static str,
        entity: &'static str,
        lease: &ScopeLease<'_>,
        result: RepoResult<T>,
    ) -> Outcome<T> {
        match result {
            Ok(value) => match self.finalize(lease, true) {
                Ok(()) => {
                    debug!(
                        "event=repo_op module=repo status=ok op={operation} entity={entity} ownership={:?}",
                        lease.ownership()
                    );
                    Outcome::success(value)
                }
                Err(err) => self.handle_fault(operation, entity, err, Some(lease)),
            },
            Err(err) => self.handle_fault(operation, entity, err, Some(lease)),
        }
    }

    /// Acquires or joins, turning an acquisition fault into the failure the
    /// operation returns.
    pub(crate) fn lease_for<'a, T>(
        &self,
        operation: &'static str,
        entity: &'static str,
        existing: Option<&'a StoreContext>,
        intent: ScopeIntent,
    ) -> Result<ScopeLease<'a>, Outcome<T>> {
        self.acquire_or_join_for(entity, existing, intent)
            .map_err(|err| self.handle_fault(operation, entity, err, None))
    }

    /// Finalizes `lease` after nested operations already produced `outcome`.
    ///
    /// Nested failures were reported by the nested call; only the root
    /// rollback happens here.
    pub(crate) fn settle<T>(
        &self,
        operation: &'static str,
        entity: &'static str,
        lease: &ScopeLease<'_>,
        outcome: Outcome<T>,
    ) -> Outcome<T> {
        if !outcome.succeeded {
            lease.abort();
            return outcome;
        }
        match self.finalize(lease, true) {
            Ok(()) => outcome,
            Err(err) => self.handle_fault(operation, entity, err, Some(lease)),
        }
    }

    /// Hands a fault to the sink without building an outcome.
    pub(crate) fn report(&self, operation: &'static str, entity: &'static str, error: &RepoError) {
        self.faults.record(operation, entity, error);
    }
}

impl std::fmt::Debug for TransactionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionCoordinator").finish_non_exhaustive()
    }
}

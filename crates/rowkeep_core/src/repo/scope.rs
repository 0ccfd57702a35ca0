//! Store handles, transaction scopes and ownership-tagged leases.
//!
//! # Responsibility
//! - Pair one SQLite connection with one explicit transaction, deferred for
//!   reads and immediate for writes.
//! - Tag every lease as `Root` (owns finalize + dispose) or `Joined` (borrowed).
//!
//! # Invariants
//! - A scope is finalized at most once; later attempts fail with
//!   `RepoError::ScopeFinalized`.
//! - Every handle the factory opened is released, including one whose
//!   transaction failed to start.
//! - Only root leases commit, roll back or dispose. Dropping an unfinalized
//!   root lease rolls it back before disposing scope, then store.
//! - Joined leases never change the scope they borrow.

use crate::db::StoreFactory;
use crate::repo::{RepoError, RepoResult};
use log::{debug, warn};
use rusqlite::Connection;
use std::cell::Cell;
use std::ops::Deref;
use std::sync::Arc;
use uuid::Uuid;

/// Who is responsible for finalizing and disposing a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeOwnership {
    /// Created by the current call.
    Root,
    /// Supplied by an ancestor call.
    Joined,
}

/// What a root scope is opened for.
///
/// Write scopes take SQLite's write lock up front (`BEGIN IMMEDIATE`); read
/// scopes start deferred so they never queue behind another connection's
/// open write scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeIntent {
    Read,
    Write,
}

impl ScopeIntent {
    fn begin_sql(self) -> &'static str {
        match self {
            Self::Read => "BEGIN DEFERRED;",
            Self::Write => "BEGIN IMMEDIATE;",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Active,
    Committed,
    RolledBack,
}

/// Connection to the relational store.
#[derive(Debug)]
pub struct StoreHandle {
    id: Uuid,
    conn: Connection,
}

impl StoreHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Active transaction on a `StoreHandle`.
#[derive(Debug)]
pub struct TransactionScope {
    id: Uuid,
    state: Cell<ScopeState>,
}

impl TransactionScope {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ScopeState {
        self.state.get()
    }

    pub fn is_active(&self) -> bool {
        self.state.get() == ScopeState::Active
    }

    fn begin(handle: &StoreHandle, intent: ScopeIntent) -> RepoResult<Self> {
        handle.conn.execute_batch(intent.begin_sql())?;
        Ok(Self {
            id: Uuid::new_v4(),
            state: Cell::new(ScopeState::Active),
        })
    }

    fn commit(&self, handle: &StoreHandle) -> RepoResult<()> {
        if !self.is_active() {
            return Err(RepoError::ScopeFinalized(self.id));
        }
        if let Err(err) = handle.conn.execute_batch("COMMIT;") {
            // A failed COMMIT can leave the transaction open.
            self.rollback(handle)?;
            return Err(err.into());
        }
        self.state.set(ScopeState::Committed);
        debug!("event=scope_commit module=repo status=ok scope={}", self.id);
        Ok(())
    }

    fn rollback(&self, handle: &StoreHandle) -> RepoResult<()> {
        if !self.is_active() {
            return Err(RepoError::ScopeFinalized(self.id));
        }
        self.state.set(ScopeState::RolledBack);
        // SQLite may already have rolled back on its own (e.g. SQLITE_FULL).
        if !handle.conn.is_autocommit() {
            handle.conn.execute_batch("ROLLBACK;")?;
        }
        debug!("event=scope_rollback module=repo status=ok scope={}", self.id);
        Ok(())
    }
}

/// A store handle together with its transaction scope.
///
/// Pass `Some(&context)` into repository operations to make them join this
/// scope instead of opening their own.
#[derive(Debug)]
pub struct StoreContext {
    handle: StoreHandle,
    scope: TransactionScope,
}

impl StoreContext {
    /// Wraps `conn` and starts its transaction. A handle whose transaction
    /// cannot start is released back to `factory` before the error returns.
    pub(crate) fn open(
        conn: Connection,
        intent: ScopeIntent,
        factory: &dyn StoreFactory,
    ) -> RepoResult<Self> {
        let handle = StoreHandle {
            id: Uuid::new_v4(),
            conn,
        };
        match TransactionScope::begin(&handle, intent) {
            Ok(scope) => Ok(Self { handle, scope }),
            Err(err) => {
                warn!(
                    "event=scope_begin module=repo status=error handle={} error={}",
                    handle.id, err
                );
                factory.release(&handle);
                Err(err)
            }
        }
    }

    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    pub fn scope(&self) -> &TransactionScope {
        &self.scope
    }

    pub fn connection(&self) -> &Connection {
        &self.handle.conn
    }

    /// Runs one store round-trip. The only place repository futures touch
    /// the store.
    pub(crate) async fn io<T>(&self, work: impl FnOnce(&Connection) -> RepoResult<T>) -> RepoResult<T> {
        work(&self.handle.conn)
    }
}

enum Lease<'a> {
    Root {
        context: StoreContext,
        factory: Arc<dyn StoreFactory>,
    },
    Joined(&'a StoreContext),
}

/// Ownership-tagged access to a `StoreContext`.
///
/// Root leases finalize through `finalize`/`complete` and release the handle
/// on drop; joined leases are inert.
pub struct ScopeLease<'a> {
    lease: Lease<'a>,
}

impl<'a> ScopeLease<'a> {
    pub(crate) fn root(context: StoreContext, factory: Arc<dyn StoreFactory>) -> Self {
        debug!(
            "event=scope_begin module=repo status=ok ownership=root handle={} scope={}",
            context.handle.id, context.scope.id
        );
        Self {
            lease: Lease::Root { context, factory },
        }
    }

    pub(crate) fn joined(context: &'a StoreContext) -> Self {
        Self {
            lease: Lease::Joined(context),
        }
    }

    pub fn ownership(&self) -> ScopeOwnership {
        match self.lease {
            Lease::Root { .. } => ScopeOwnership::Root,
            Lease::Joined(_) => ScopeOwnership::Joined,
        }
    }

    pub fn is_root(&self) -> bool {
        self.ownership() == ScopeOwnership::Root
    }

    pub fn context(&self) -> &StoreContext {
        match &self.lease {
            Lease::Root { context, .. } => context,
            Lease::Joined(context) => *context,
        }
    }

    /// Commits (`succeeded`) or rolls back a root scope. No-op when joined.
    pub fn finalize(&self, succeeded: bool) -> RepoResult<()> {
        let Lease::Root { context, .. } = &self.lease else {
            return Ok(());
        };
        if succeeded {
            context.scope.commit(&context.handle)
        } else {
            context.scope.rollback(&context.handle)
        }
    }

    /// Rolls back a root scope that is still active. No-op otherwise.
    pub(crate) fn abort(&self) {
        let Lease::Root { context, .. } = &self.lease else {
            return;
        };
        if context.scope.is_active() {
            if let Err(err) = context.scope.rollback(&context.handle) {
                warn!(
                    "event=scope_rollback module=repo status=error scope={} error={}",
                    context.scope.id, err
                );
            }
        }
    }

    /// Finalizes and releases in one step.
    pub fn complete(self, succeeded: bool) -> RepoResult<()> {
        self.finalize(succeeded)
    }
}

impl Deref for ScopeLease<'_> {
    type Target = StoreContext;

    fn deref(&self) -> &Self::Target {
        self.context()
    }
}

impl Drop for ScopeLease<'_> {
    fn drop(&mut self) {
        let Lease::Root { context, factory } = &self.lease else {
            return;
        };
        if context.scope.is_active() {
            warn!(
                "event=scope_dispose module=repo status=unfinalized scope={}",
                context.scope.id
            );
            self.abort();
        }
        factory.release(&context.handle);
        debug!(
            "event=scope_dispose module=repo status=ok handle={} scope={} state={:?}",
            context.handle.id,
            context.scope.id,
            context.scope.state()
        );
    }
}

impl std::fmt::Debug for ScopeLease<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeLease")
            .field("ownership", &self.ownership())
            .field("scope", &self.context().scope.id)
            .finish()
    }
}

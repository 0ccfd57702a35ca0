//! Generic CRUD, existence and aggregate operations for one entity type.
//!
//! # Responsibility
//! - Run every operation as acquire -> act -> finalize -> release.
//! - Convert faults into `Outcome` failures at the operation boundary.
//!
//! # Invariants
//! - Writes are flushed within the call; "rows affected > 0" signals success.
//! - Nested operations receive the caller's scope and never finalize it.
//! - `exists` collapses probe faults into `false`; use `exists_checked` to
//!   tell them apart.

use super::coordinator::TransactionCoordinator;
use super::pager::{QueryPager, SortFallback};
use super::patcher::FieldPatcher;
use super::scope::{ScopeIntent, StoreContext};
use super::sql::{self, Window};
use super::{RepoError, RepoResult};
use crate::field::{Entity, FieldKind, Filter};
use crate::model::{ErrorKind, FieldPatch, Outcome, PageQuery, PageResult};
use pollster::block_on;
use crate::view::{View, ViewProjector};

type Record<V> = <V as View>::Record;

/// Repository over the entity wrapped by view type `V`.
pub struct ModelStore<V: View> {
    coordinator: TransactionCoordinator,
    projector: ViewProjector<V>,
    pager: QueryPager<V>,
    patcher: FieldPatcher<Record<V>>,
}

impl<V: View> ModelStore<V> {
    pub fn new(coordinator: TransactionCoordinator, projector: ViewProjector<V>) -> Self {
        Self {
            pager: QueryPager::new(coordinator.clone(), projector.clone()),
            patcher: FieldPatcher::new(coordinator.clone()),
            coordinator,
            projector,
        }
    }

    pub fn with_sort_fallback(mut self, fallback: SortFallback) -> Self {
        self.pager = self.pager.with_sort_fallback(fallback);
        self
    }

    pub fn coordinator(&self) -> &TransactionCoordinator {
        &self.coordinator
    }

    pub fn pager(&self) -> &QueryPager<V> {
        &self.pager
    }

    pub fn patcher(&self) -> &FieldPatcher<Record<V>> {
        &self.patcher
    }

    fn entity() -> &'static str {
        <Record<V> as Entity>::table_name()
    }

    /// True iff at least one stored record matches `filter`.
    ///
    /// A faulted probe is logged and reported as `false`.
    pub async fn exists(&self, filter: &Filter, context: Option<&StoreContext>) -> bool {
        self.probe("exists", filter, context)
            .await
            .data
            .unwrap_or(false)
    }

    /// Instance form of `exists`: matches on `record`'s key fields.
    pub async fn exists_record(&self, record: &Record<V>, context: Option<&StoreContext>) -> bool {
        match Filter::matching_key(record) {
            Ok(filter) => self.exists(&filter, context).await,
            Err(err) => {
                self.coordinator.report("exists", Self::entity(), &err);
                false
            }
        }
    }

    /// Like `exists`, but probe faults come back as `ExistsCheckFailure`.
    pub async fn exists_checked(
        &self,
        filter: &Filter,
        context: Option<&StoreContext>,
    ) -> Outcome<bool> {
        let mut outcome = self.probe("exists_checked", filter, context).await;
        if let Some(error) = outcome.error.as_mut() {
            error.kind = ErrorKind::ExistsCheckFailure;
        }
        outcome
    }

    async fn probe(
        &self,
        operation: &'static str,
        filter: &Filter,
        context: Option<&StoreContext>,
    ) -> Outcome<bool> {
        let lease = match self.coordinator.lease_for(
            operation,
            Self::entity(),
            context,
            ScopeIntent::Read,
        ) {
            Ok(lease) => lease,
            Err(failure) => return failure,
        };
        let result = lease
            .io(|conn| sql::exists::<Record<V>>(conn, filter))
            .await;
        self.coordinator
            .conclude(operation, Self::entity(), &lease, result)
    }

    /// Inserts the view's record and returns the same view, with any
    /// store-assigned key filled in.
    pub async fn create(&self, mut view: V, context: Option<&StoreContext>) -> Outcome<V> {
        let lease = match self.coordinator.lease_for(
            "create",
            Self::entity(),
            context,
            ScopeIntent::Write,
        ) {
            Ok(lease) => lease,
            Err(failure) => return failure,
        };
        let result = lease
            .io(|conn| sql::insert(conn, view.record_mut()))
            .await;
        self.coordinator
            .conclude("create", Self::entity(), &lease, result.map(|()| view))
    }

    /// Replaces every column of the stored record sharing the view's key.
    pub async fn edit(&self, view: V, context: Option<&StoreContext>) -> Outcome<V> {
        let lease = match self.coordinator.lease_for(
            "edit",
            Self::entity(),
            context,
            ScopeIntent::Write,
        ) {
            Ok(lease) => lease,
            Err(failure) => return failure,
        };
        let result = lease.io(|conn| sql::update(conn, view.record())).await;
        self.coordinator
            .conclude("edit", Self::entity(), &lease, result.map(|()| view))
    }

    /// Upsert decided by an existence probe, not by key presence.
    pub async fn save(&self, view: V, context: Option<&StoreContext>) -> Outcome<V> {
        let lease = match self.coordinator.lease_for(
            "save",
            Self::entity(),
            context,
            ScopeIntent::Write,
        ) {
            Ok(lease) => lease,
            Err(failure) => return failure,
        };
        let scope = Some(lease.context());
        let outcome = if self.exists_record(view.record(), scope).await {
            self.edit(view, scope).await
        } else {
            self.create(view, scope).await
        };
        self.coordinator
            .settle("save", Self::entity(), &lease, outcome)
    }

    /// Removes the first record matching `filter`.
    ///
    /// Succeeds with no data when nothing matches.
    pub async fn remove_one(
        &self,
        filter: &Filter,
        context: Option<&StoreContext>,
    ) -> Outcome<Record<V>> {
        let lease = match self.coordinator.lease_for(
            "remove_one",
            Self::entity(),
            context,
            ScopeIntent::Write,
        ) {
            Ok(lease) => lease,
            Err(failure) => return failure,
        };
        let result = self.remove_first(&lease, filter).await;
        self.coordinator
            .conclude("remove_one", Self::entity(), &lease, result)
            .flatten()
    }

    /// Instance form of `remove_one`: removes the stored row sharing
    /// `record`'s key.
    pub async fn remove_record(
        &self,
        record: Record<V>,
        context: Option<&StoreContext>,
    ) -> Outcome<Record<V>> {
        let lease = match self.coordinator.lease_for(
            "remove_one",
            Self::entity(),
            context,
            ScopeIntent::Write,
        ) {
            Ok(lease) => lease,
            Err(failure) => return failure,
        };
        let result = remove_existing(&lease, record).await;
        self.coordinator
            .conclude("remove_one", Self::entity(), &lease, result)
            .flatten()
    }

    /// Removes every match one at a time, stopping at the first failure.
    ///
    /// Removals before the failure are only undone when this call owns the
    /// scope.
    pub async fn remove_many(
        &self,
        filter: &Filter,
        context: Option<&StoreContext>,
    ) -> Outcome<Vec<Record<V>>> {
        let lease = match self.coordinator.lease_for(
            "remove_many",
            Self::entity(),
            context,
            ScopeIntent::Write,
        ) {
            Ok(lease) => lease,
            Err(failure) => return failure,
        };
        let matches = lease
            .io(|conn| sql::select::<Record<V>>(conn, filter, None, None))
            .await;
        let records = match matches {
            Ok(records) => records,
            Err(err) => {
                return self
                    .coordinator
                    .handle_fault("remove_many", Self::entity(), err, Some(&lease))
            }
        };

        let mut removed = Vec::with_capacity(records.len());
        for record in records {
            let outcome = self.remove_record(record, Some(lease.context())).await;
            if !outcome.succeeded {
                return self.coordinator.settle(
                    "remove_many",
                    Self::entity(),
                    &lease,
                    outcome.into_failure(),
                );
            }
            removed.extend(outcome.data);
        }

        self.coordinator
            .settle("remove_many", Self::entity(), &lease, Outcome::success(removed))
    }

    /// Reads the single record matching `filter`.
    ///
    /// Zero matches and more than one match both fail as `NotFound`.
    pub async fn fetch_one(&self, filter: &Filter, context: Option<&StoreContext>) -> Outcome<V> {
        let lease = match self.coordinator.lease_for(
            "fetch_one",
            Self::entity(),
            context,
            ScopeIntent::Read,
        ) {
            Ok(lease) => lease,
            Err(failure) => return failure,
        };
        let result = self.find_single(&lease, filter).await;
        self.coordinator
            .conclude("fetch_one", Self::entity(), &lease, result)
    }

    pub async fn fetch_all(&self, context: Option<&StoreContext>) -> Outcome<Vec<V>> {
        self.fetch_many(&Filter::all(), context).await
    }

    pub async fn fetch_many(
        &self,
        filter: &Filter,
        context: Option<&StoreContext>,
    ) -> Outcome<Vec<V>> {
        let lease = match self.coordinator.lease_for(
            "fetch_many",
            Self::entity(),
            context,
            ScopeIntent::Read,
        ) {
            Ok(lease) => lease,
            Err(failure) => return failure,
        };
        let result = self.find_all(&lease, filter).await;
        self.coordinator
            .conclude("fetch_many", Self::entity(), &lease, result)
    }

    /// Counts records matching `filter`, or all records when `None`.
    ///
    /// Failures carry `Some(0)` as data.
    pub async fn count(&self, filter: Option<&Filter>, context: Option<&StoreContext>) -> Outcome<u64> {
        let everything = Filter::all();
        let filter = filter.unwrap_or(&everything);
        let lease = match self.coordinator.lease_for(
            "count",
            Self::entity(),
            context,
            ScopeIntent::Read,
        ) {
            Ok(lease) => lease,
            Err(failure) => return Outcome::with_placeholder(failure, 0),
        };
        let result = lease
            .io(|conn| sql::count::<Record<V>>(conn, filter))
            .await;
        self.coordinator
            .conclude("count", Self::entity(), &lease, result)
            .with_placeholder(0)
    }

    /// Largest value of an integer field across all records.
    ///
    /// An empty table fails as `NotFound`; failures carry `Some(0)` as data.
    pub async fn max(&self, field: &str, context: Option<&StoreContext>) -> Outcome<i64> {
        let lease = match self.coordinator.lease_for(
            "max",
            Self::entity(),
            context,
            ScopeIntent::Read,
        ) {
            Ok(lease) => lease,
            Err(failure) => return Outcome::with_placeholder(failure, 0),
        };
        let result = max_of::<Record<V>>(&lease, field).await;
        self.coordinator
            .conclude("max", Self::entity(), &lease, result)
            .with_placeholder(0)
    }

    pub async fn page(
        &self,
        filter: &Filter,
        query: &PageQuery,
        context: Option<&StoreContext>,
    ) -> Outcome<PageResult<V>> {
        self.pager.page(filter, query, context).await
    }

    pub async fn patch_one(
        &self,
        filter: &Filter,
        patches: &[FieldPatch],
        context: Option<&StoreContext>,
    ) -> Outcome<Record<V>> {
        self.patcher.patch_one(filter, patches, context).await
    }

    async fn remove_first(
        &self,
        context: &StoreContext,
        filter: &Filter,
    ) -> RepoResult<Option<Record<V>>> {
        let first = Window {
            limit: 1,
            offset: 0,
        };
        let found = context
            .io(|conn| sql::select::<Record<V>>(conn, filter, None, Some(first)))
            .await?;
        match found.into_iter().next() {
            Some(record) => remove_existing(context, record).await,
            None => Ok(None),
        }
    }

    async fn find_single(&self, context: &StoreContext, filter: &Filter) -> RepoResult<V> {
        let probe = Window {
            limit: 2,
            offset: 0,
        };
        let mut matches = context
            .io(|conn| sql::select::<Record<V>>(conn, filter, None, Some(probe)))
            .await?;
        if matches.len() > 1 {
            return Err(RepoError::not_found(
                Self::entity(),
                "more than one record matched",
            ));
        }
        let record = matches
            .pop()
            .ok_or_else(|| RepoError::not_found(Self::entity(), "no record matched"))?;
        self.projector.to_view(record, context)
    }

    async fn find_all(&self, context: &StoreContext, filter: &Filter) -> RepoResult<Vec<V>> {
        let records = context
            .io(|conn| sql::select::<Record<V>>(conn, filter, None, None))
            .await?;
        self.projector.to_views(records, context)
    }
}

/// Blocking twins: each drives the async operation to completion.
impl<V: View> ModelStore<V> {
    pub fn exists_blocking(&self, filter: &Filter, context: Option<&StoreContext>) -> bool {
        block_on(self.exists(filter, context))
    }

    pub fn exists_record_blocking(
        &self,
        record: &Record<V>,
        context: Option<&StoreContext>,
    ) -> bool {
        block_on(self.exists_record(record, context))
    }

    pub fn exists_checked_blocking(
        &self,
        filter: &Filter,
        context: Option<&StoreContext>,
    ) -> Outcome<bool> {
        block_on(self.exists_checked(filter, context))
    }

    pub fn create_blocking(&self, view: V, context: Option<&StoreContext>) -> Outcome<V> {
        block_on(self.create(view, context))
    }

    pub fn edit_blocking(&self, view: V, context: Option<&StoreContext>) -> Outcome<V> {
        block_on(self.edit(view, context))
    }

    pub fn save_blocking(&self, view: V, context: Option<&StoreContext>) -> Outcome<V> {
        block_on(self.save(view, context))
    }

    pub fn remove_one_blocking(
        &self,
        filter: &Filter,
        context: Option<&StoreContext>,
    ) -> Outcome<Record<V>> {
        block_on(self.remove_one(filter, context))
    }

    pub fn remove_record_blocking(
        &self,
        record: Record<V>,
        context: Option<&StoreContext>,
    ) -> Outcome<Record<V>> {
        block_on(self.remove_record(record, context))
    }

    pub fn remove_many_blocking(
        &self,
        filter: &Filter,
        context: Option<&StoreContext>,
    ) -> Outcome<Vec<Record<V>>> {
        block_on(self.remove_many(filter, context))
    }

    pub fn fetch_one_blocking(&self, filter: &Filter, context: Option<&StoreContext>) -> Outcome<V> {
        block_on(self.fetch_one(filter, context))
    }

    pub fn fetch_all_blocking(&self, context: Option<&StoreContext>) -> Outcome<Vec<V>> {
        block_on(self.fetch_all(context))
    }

    pub fn fetch_many_blocking(
        &self,
        filter: &Filter,
        context: Option<&StoreContext>,
    ) -> Outcome<Vec<V>> {
        block_on(self.fetch_many(filter, context))
    }

    pub fn count_blocking(
        &self,
        filter: Option<&Filter>,
        context: Option<&StoreContext>,
    ) -> Outcome<u64> {
        block_on(self.count(filter, context))
    }

    pub fn max_blocking(&self, field: &str, context: Option<&StoreContext>) -> Outcome<i64> {
        block_on(self.max(field, context))
    }

    pub fn page_blocking(
        &self,
        filter: &Filter,
        query: &PageQuery,
        context: Option<&StoreContext>,
    ) -> Outcome<PageResult<V>> {
        block_on(self.page(filter, query, context))
    }

    pub fn patch_one_blocking(
        &self,
        filter: &Filter,
        patches: &[FieldPatch],
        context: Option<&StoreContext>,
    ) -> Outcome<Record<V>> {
        block_on(self.patch_one(filter, patches, context))
    }
}

async fn remove_existing<E: Entity>(context: &StoreContext, record: E) -> RepoResult<Option<E>> {
    let removed = context.io(|conn| sql::delete(conn, &record)).await?;
    Ok(removed.then_some(record))
}

async fn max_of<E: Entity>(context: &StoreContext, field: &str) -> RepoResult<i64> {
    let table = E::field_table();
    let accessor = table.resolve(field)?;
    if accessor.kind() != FieldKind::Integer {
        return Err(RepoError::FieldType {
            entity: table.table(),
            field: accessor.name(),
            expected: FieldKind::Integer,
            actual: accessor.kind().to_string(),
        });
    }
    context
        .io(|conn| sql::max(conn, accessor))
        .await?
        .ok_or_else(|| RepoError::not_found(table.table(), "no records to aggregate"))
}

//! Total-aware paging over filtered entity queries.
//!
//! # Invariants
//! - `total_items` counts the whole filtered sequence before windowing.
//! - Rows are ordered by the resolved field, then by key fields, so adjacent
//!   pages never overlap or skip rows.
//! - With `SortFallback::FirstDeclaredField`, an unknown order-by name sorts by
//!   the entity's first declared field instead of failing.

use super::coordinator::TransactionCoordinator;
use super::scope::{ScopeIntent, StoreContext};
use super::sql::{self, SortSpec, Window};
use super::RepoResult;
use crate::field::{Entity, FieldAccessor, Filter};
use crate::model::page::total_pages;
use crate::model::{Outcome, PageQuery, PageResult};
use pollster::block_on;
use crate::view::{View, ViewProjector};
use log::warn;

const OPERATION: &str = "page";

/// What to do when the requested sort field does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortFallback {
    /// Sort by the first declared field and log a warning.
    #[default]
    FirstDeclaredField,
    /// Fail with `FieldResolutionFailure`.
    Reject,
}

pub struct QueryPager<V: View> {
    coordinator: TransactionCoordinator,
    projector: ViewProjector<V>,
    fallback: SortFallback,
}

impl<V: View> QueryPager<V> {
    pub fn new(coordinator: TransactionCoordinator, projector: ViewProjector<V>) -> Self {
        Self {
            coordinator,
            projector,
            fallback: SortFallback::default(),
        }
    }

    pub fn with_sort_fallback(mut self, fallback: SortFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn sort_fallback(&self) -> SortFallback {
        self.fallback
    }

    /// Sorts the records matching `filter` and returns the window `query`
    /// asks for.
    pub async fn page(
        &self,
        filter: &Filter,
        query: &PageQuery,
        context: Option<&StoreContext>,
    ) -> Outcome<PageResult<V>> {
        let entity = <V::Record as Entity>::table_name();
        let lease = match self.coordinator.lease_for(
            OPERATION,
            entity,
            context,
            ScopeIntent::Read,
        ) {
            Ok(lease) => lease,
            Err(failure) => return failure,
        };
        let result = self.load(&lease, filter, query).await;
        self.coordinator.conclude(OPERATION, entity, &lease, result)
    }

    pub fn page_blocking(
        &self,
        filter: &Filter,
        query: &PageQuery,
        context: Option<&StoreContext>,
    ) -> Outcome<PageResult<V>> {
        block_on(self.page(filter, query, context))
    }

    async fn load(
        &self,
        context: &StoreContext,
        filter: &Filter,
        query: &PageQuery,
    ) -> RepoResult<PageResult<V>> {
        let total_items = context
            .io(|conn| sql::count::<V::Record>(conn, filter))
            .await?;
        let field = self.resolve_sort_field(&query.order_by_field)?;

        let page_size = query.effective_page_size();
        let page_index = page_size.map_or(0, |_| query.page_index.unwrap_or(0));
        let window = page_size.map(|size| Window {
            limit: u64::from(size),
            offset: u64::from(page_index) * u64::from(size),
        });

        let sort = SortSpec {
            field,
            direction: query.direction,
        };
        let records = context
            .io(|conn| sql::select::<V::Record>(conn, filter, Some(sort), window))
            .await?;
        let items = self.projector.to_views(records, context)?;

        Ok(PageResult {
            items,
            total_items,
            total_pages: total_pages(total_items, page_size),
            page_index: u64::from(page_index),
            page_size: page_size.map_or(total_items, u64::from),
        })
    }

    fn resolve_sort_field(&self, name: &str) -> RepoResult<&'static FieldAccessor<V::Record>> {
        let table = <V::Record as Entity>::field_table();
        let err = match table.resolve(name) {
            Ok(field) => return Ok(field),
            Err(err) => err,
        };
        if self.fallback == SortFallback::Reject {
            return Err(err);
        }

        let fallback = table.first_declared().ok_or(err)?;
        warn!(
            "event=page_sort_fallback module=repo status=degraded entity={} requested={} used={}",
            table.table(),
            name,
            fallback.name()
        );
        Ok(fallback)
    }
}

impl<V: View> Clone for QueryPager<V> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            projector: self.projector.clone(),
            fallback: self.fallback,
        }
    }
}

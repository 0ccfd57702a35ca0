//! Named-field patching of a single record.
//!
//! # Invariants
//! - Each patch is persisted on its own round-trip, in submission order.
//! - An unresolvable field aborts the remaining patches; earlier patches stay
//!   written unless this call owns the root scope.

use super::coordinator::TransactionCoordinator;
use super::scope::{ScopeIntent, StoreContext};
use super::sql::{self, Window};
use super::{RepoError, RepoResult};
use crate::field::{coerce_patch_value, Entity, Filter};
use crate::model::{FieldPatch, Outcome};
use pollster::block_on;
use log::debug;
use std::marker::PhantomData;

const OPERATION: &str = "patch_one";

pub struct FieldPatcher<E: Entity> {
    coordinator: TransactionCoordinator,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> FieldPatcher<E> {
    pub fn new(coordinator: TransactionCoordinator) -> Self {
        Self {
            coordinator,
            _entity: PhantomData,
        }
    }

    /// Applies `patches` to the first record matching `filter`.
    pub async fn patch_one(
        &self,
        filter: &Filter,
        patches: &[FieldPatch],
        context: Option<&StoreContext>,
    ) -> Outcome<E> {
        let entity = E::table_name();
        let lease = match self.coordinator.lease_for(
            OPERATION,
            entity,
            context,
            ScopeIntent::Write,
        ) {
            Ok(lease) => lease,
            Err(failure) => return failure,
        };
        let result = self.apply(&lease, filter, patches).await;
        self.coordinator.conclude(OPERATION, entity, &lease, result)
    }

    pub fn patch_one_blocking(
        &self,
        filter: &Filter,
        patches: &[FieldPatch],
        context: Option<&StoreContext>,
    ) -> Outcome<E> {
        block_on(self.patch_one(filter, patches, context))
    }

    async fn apply(
        &self,
        context: &StoreContext,
        filter: &Filter,
        patches: &[FieldPatch],
    ) -> RepoResult<E> {
        let table = E::field_table();
        let first = Window {
            limit: 1,
            offset: 0,
        };
        let mut record = context
            .io(|conn| sql::select::<E>(conn, filter, None, Some(first)))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::not_found(table.table(), "no record matched the patch filter"))?;

        for patch in patches {
            let field = table.resolve(&patch.property_name)?;
            let key = Filter::matching_key(&record)?;
            field.set(&mut record, coerce_patch_value(&patch.property_value))?;

            let stored = field.get(&record);
            context
                .io(|conn| sql::update_column::<E>(conn, field, &stored, &key))
                .await?;
            debug!(
                "event=patch_field module=repo status=ok entity={} field={}",
                table.table(),
                field.name()
            );
        }

        Ok(record)
    }
}

impl<E: Entity> Clone for FieldPatcher<E> {
    fn clone(&self) -> Self {
        Self::new(self.coordinator.clone())
    }
}

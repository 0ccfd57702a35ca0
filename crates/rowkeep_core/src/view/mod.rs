//! Projection from persisted records to caller-facing views.
//!
//! # Responsibility
//! - Build views through an explicitly injected factory.
//! - Give "rich" factories the active `StoreContext` so they can issue
//!   follow-up queries inside the same scope.
//!
//! # Invariants
//! - Records handed to a factory are owned values, never live store rows.
//! - Sequences are projected in order.

use crate::field::Entity;
use crate::repo::{RepoResult, StoreContext};
use std::sync::Arc;

/// Caller-facing wrapper around one persisted record.
pub trait View {
    type Record: Entity;

    fn record(&self) -> &Self::Record;

    fn record_mut(&mut self) -> &mut Self::Record;
}

type RichFactory<V> = dyn Fn(<V as View>::Record, &StoreContext) -> RepoResult<V> + Send + Sync;
type PlainFactory<V> = dyn Fn(<V as View>::Record) -> V + Send + Sync;

enum ViewShape<V: View> {
    Rich(Arc<RichFactory<V>>),
    Plain(Arc<PlainFactory<V>>),
}

/// Builds `V` values from records.
pub struct ViewProjector<V: View> {
    shape: ViewShape<V>,
}

impl<V: View> ViewProjector<V> {
    /// Views that only need the record.
    pub fn plain(factory: impl Fn(V::Record) -> V + Send + Sync + 'static) -> Self {
        Self {
            shape: ViewShape::Plain(Arc::new(factory)),
        }
    }

    /// Views that may query the store while being built.
    pub fn rich(
        factory: impl Fn(V::Record, &StoreContext) -> RepoResult<V> + Send + Sync + 'static,
    ) -> Self {
        Self {
            shape: ViewShape::Rich(Arc::new(factory)),
        }
    }

    pub fn is_rich(&self) -> bool {
        matches!(self.shape, ViewShape::Rich(_))
    }

    pub fn to_view(&self, record: V::Record, context: &StoreContext) -> RepoResult<V> {
        match &self.shape {
            ViewShape::Rich(factory) => factory(record, context),
            ViewShape::Plain(factory) => Ok(factory(record)),
        }
    }

    pub fn to_views(&self, records: Vec<V::Record>, context: &StoreContext) -> RepoResult<Vec<V>> {
        records
            .into_iter()
            .map(|record| self.to_view(record, context))
            .collect()
    }
}

impl<V: View> Clone for ViewProjector<V> {
    fn clone(&self) -> Self {
        let shape = match &self.shape {
            ViewShape::Rich(factory) => ViewShape::Rich(Arc::clone(factory)),
            ViewShape::Plain(factory) => ViewShape::Plain(Arc::clone(factory)),
        };
        Self { shape }
    }
}

impl<V: View> std::fmt::Debug for ViewProjector<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape = if self.is_rich() { "rich" } else { "plain" };
        f.debug_struct("ViewProjector").field("shape", &shape).finish()
    }
}

//! Field resolution for entity types.
//!
//! # Responsibility
//! - Register per-type field accessor tables (name -> typed get/set).
//! - Coerce untyped wire values and express predicates over named fields.
//!
//! # Invariants
//! - Paging and patching resolve names through the same `FieldTable`.

pub mod filter;
pub mod table;
pub mod value;

pub use filter::{Comparison, Filter};
pub use table::{Entity, FieldAccessor, FieldTable, FieldTableBuilder, FieldType};
pub use value::{coerce_patch_value, FieldKind, FieldValue};

//! Caller-facing data shapes shared by every repository operation.
//!
//! # Responsibility
//! - Define the `Outcome` envelope and its error payload.
//! - Define paging and patch request/response types as they travel on the wire.

pub mod outcome;
pub mod page;
pub mod patch;

pub use outcome::{ErrorInfo, ErrorKind, Outcome};
pub use page::{PageQuery, PageResult, SortDirection};
pub use patch::FieldPatch;

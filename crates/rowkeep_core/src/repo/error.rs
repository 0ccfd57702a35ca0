//! Repository error type and its mapping onto caller-facing error kinds.

use crate::db::DbError;
use crate::field::FieldKind;
use crate::model::{ErrorInfo, ErrorKind};
use thiserror::Error;
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Every fault a repository operation can run into.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    #[error("{0}")]
    Db(#[from] DbError),
    #[error("{entity} not found: {detail}")]
    NotFound {
        entity: &'static str,
        detail: String,
    },
    #[error("unknown field `{field}` on `{entity}`")]
    UnknownField { entity: &'static str, field: String },
    #[error("field `{entity}.{field}` expects {expected}, got {actual}")]
    FieldType {
        entity: &'static str,
        field: &'static str,
        expected: FieldKind,
        actual: String,
    },
    #[error("`{entity}` declares no key fields")]
    MissingKey { entity: &'static str },
    #[error("{operation} on `{entity}` affected no rows")]
    NoRowsAffected {
        entity: &'static str,
        operation: &'static str,
    },
    /// Persisted data cannot be converted into the entity type.
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("transaction scope {0} is already finalized")]
    ScopeFinalized(Uuid),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    pub fn not_found(entity: &'static str, detail: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::UnknownField { .. } | Self::FieldType { .. } => {
                ErrorKind::FieldResolutionFailure
            }
            Self::Db(_)
            | Self::MissingKey { .. }
            | Self::NoRowsAffected { .. }
            | Self::InvalidData(_)
            | Self::ScopeFinalized(_) => ErrorKind::PersistenceFailure,
        }
    }
}

impl From<&RepoError> for ErrorInfo {
    fn from(value: &RepoError) -> Self {
        ErrorInfo::new(value.kind(), value.to_string())
    }
}

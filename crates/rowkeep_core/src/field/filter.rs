//! Predicates over entity fields, rendered to parameterized SQL.
//!
//! # Invariants
//! - Field names are resolved against the entity's `FieldTable` before any SQL
//!   is built; unknown names fail with `RepoError::UnknownField`.
//! - Values are always bound as parameters, never interpolated.

use super::table::Entity;
use super::value::FieldValue;
use crate::repo::sql::quote_ident;
use crate::repo::{RepoError, RepoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    field: String,
    comparison: Comparison,
    value: FieldValue,
}

/// Conjunction of field comparisons. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn compare(
        field: impl Into<String>,
        comparison: Comparison,
        value: impl Into<FieldValue>,
    ) -> Self {
        Self {
            clauses: vec![Clause {
                field: field.into(),
                comparison,
                value: value.into(),
            }],
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, Comparison::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, Comparison::Ne, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, Comparison::Lt, value)
    }

    pub fn le(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, Comparison::Le, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, Comparison::Gt, value)
    }

    pub fn ge(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, Comparison::Ge, value)
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(field, Comparison::Like, FieldValue::Text(pattern.into()))
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::compare(field, Comparison::IsNull, FieldValue::Null)
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::compare(field, Comparison::IsNotNull, FieldValue::Null)
    }

    /// Both `self` and `other` must hold.
    pub fn and(mut self, other: Filter) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Matches the stored row sharing `record`'s key fields.
    pub fn matching_key<E: Entity>(record: &E) -> RepoResult<Self> {
        let table = E::field_table();
        let clauses: Vec<Clause> = table
            .keys()
            .map(|key| Clause {
                field: key.name().to_string(),
                comparison: Comparison::Eq,
                value: key.get(record),
            })
            .collect();

        if clauses.is_empty() {
            return Err(RepoError::MissingKey {
                entity: table.table(),
            });
        }
        Ok(Self { clauses })
    }

    /// Renders ` WHERE ...` (or an empty string) plus the bound values.
    pub(crate) fn render<E: Entity>(&self) -> RepoResult<(String, Vec<FieldValue>)> {
        if self.clauses.is_empty() {
            return Ok((String::new(), Vec::new()));
        }

        let table = E::field_table();
        let mut parts = Vec::with_capacity(self.clauses.len());
        let mut values = Vec::new();

        for clause in &self.clauses {
            let column = quote_ident(table.resolve(&clause.field)?.name());
            let operator = match (clause.comparison, clause.value.is_null()) {
                (Comparison::Eq, true) | (Comparison::IsNull, _) => {
                    parts.push(format!("{column} IS NULL"));
                    continue;
                }
                (Comparison::Ne, true) | (Comparison::IsNotNull, _) => {
                    parts.push(format!("{column} IS NOT NULL"));
                    continue;
                }
                (Comparison::Eq, false) => "=",
                (Comparison::Ne, false) => "<>",
                (Comparison::Lt, _) => "<",
                (Comparison::Le, _) => "<=",
                (Comparison::Gt, _) => ">",
                (Comparison::Ge, _) => ">=",
                (Comparison::Like, _) => "LIKE",
            };
            parts.push(format!("{column} {operator} ?"));
            values.push(clause.value.clone());
        }

        Ok((format!(" WHERE {}", parts.join(" AND ")), values))
    }
}

//! Compile-time registered field-accessor tables.
//!
//! # Responsibility
//! - Map property names to typed get/set closures for one entity type.
//! - Serve both sort-field resolution and field patching.
//!
//! # Invariants
//! - Declaration order is preserved; the first registered field is the
//!   "first declared field".
//! - Setters never store a value of the wrong kind.

use super::value::{FieldKind, FieldValue};
use crate::repo::{RepoError, RepoResult};
use chrono::NaiveDateTime;

/// A persisted row type.
///
/// Implementors build their table once, typically in a `once_cell::sync::Lazy`
/// static, and return it from `field_table`.
pub trait Entity: Default + Clone + Send + 'static {
    fn field_table() -> &'static FieldTable<Self>;

    fn table_name() -> &'static str {
        Self::field_table().table()
    }
}

/// Rust types that can back an entity field.
pub trait FieldType: Sized {
    const KIND: FieldKind;
    const NULLABLE: bool = false;

    fn into_value(self) -> FieldValue;

    /// Returns `None` when `value` cannot be stored in this type.
    fn from_value(value: FieldValue) -> Option<Self>;
}

impl FieldType for i64 {
    const KIND: FieldKind = FieldKind::Integer;

    fn into_value(self) -> FieldValue {
        FieldValue::Integer(self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Integer(value) => Some(value),
            _ => None,
        }
    }
}

impl FieldType for i32 {
    const KIND: FieldKind = FieldKind::Integer;

    fn into_value(self) -> FieldValue {
        FieldValue::Integer(i64::from(self))
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Integer(value) => i32::try_from(value).ok(),
            _ => None,
        }
    }
}

impl FieldType for f64 {
    const KIND: FieldKind = FieldKind::Real;

    fn into_value(self) -> FieldValue {
        FieldValue::Real(self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Real(value) => Some(value),
            FieldValue::Integer(value) => Some(value as f64),
            _ => None,
        }
    }
}

impl FieldType for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn into_value(self) -> FieldValue {
        FieldValue::Boolean(self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Boolean(value) => Some(value),
            FieldValue::Integer(0) => Some(false),
            FieldValue::Integer(1) => Some(true),
            _ => None,
        }
    }
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::Text;

    fn into_value(self) -> FieldValue {
        FieldValue::Text(self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl FieldType for NaiveDateTime {
    const KIND: FieldKind = FieldKind::DateTime;

    fn into_value(self) -> FieldValue {
        FieldValue::DateTime(self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::DateTime(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: FieldType> FieldType for Option<T> {
    const KIND: FieldKind = T::KIND;
    const NULLABLE: bool = true;

    fn into_value(self) -> FieldValue {
        self.map_or(FieldValue::Null, FieldType::into_value)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldRole {
    Plain,
    Key,
    GeneratedKey,
}

type Getter<E> = Box<dyn Fn(&E) -> FieldValue + Send + Sync>;
type Setter<E> = Box<dyn Fn(&mut E, FieldValue) -> Result<(), FieldValue> + Send + Sync>;

/// Typed accessor pair for one named field.
pub struct FieldAccessor<E> {
    table: &'static str,
    name: &'static str,
    kind: FieldKind,
    nullable: bool,
    role: FieldRole,
    get: Getter<E>,
    set: Setter<E>,
}

impl<E> FieldAccessor<E> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_key(&self) -> bool {
        self.role != FieldRole::Plain
    }

    pub fn is_generated(&self) -> bool {
        self.role == FieldRole::GeneratedKey
    }

    pub fn get(&self, record: &E) -> FieldValue {
        (self.get)(record)
    }

    /// Assigns `value`, rejecting kinds the backing Rust type cannot hold.
    pub fn set(&self, record: &mut E, value: FieldValue) -> RepoResult<()> {
        (self.set)(record, value).map_err(|rejected| RepoError::FieldType {
            entity: self.table,
            field: self.name,
            expected: self.kind,
            actual: rejected.describe(),
        })
    }
}

impl<E> std::fmt::Debug for FieldAccessor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .field("role", &self.role)
            .finish()
    }
}

/// Ordered name -> accessor mapping for one entity type.
#[derive(Debug)]
pub struct FieldTable<E> {
    table: &'static str,
    fields: Vec<FieldAccessor<E>>,
}

impl<E: 'static> FieldTable<E> {
    pub fn builder(table: &'static str) -> FieldTableBuilder<E> {
        FieldTableBuilder {
            table,
            fields: Vec::new(),
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn fields(&self) -> &[FieldAccessor<E>] {
        &self.fields
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldAccessor<E>> {
        self.fields.iter().filter(|field| field.is_key())
    }

    pub fn generated_key(&self) -> Option<&FieldAccessor<E>> {
        self.fields.iter().find(|field| field.is_generated())
    }

    pub fn first_declared(&self) -> Option<&FieldAccessor<E>> {
        self.fields.first()
    }

    /// Resolves `name` exactly as declared.
    pub fn resolve(&self, name: &str) -> RepoResult<&FieldAccessor<E>> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .ok_or_else(|| RepoError::UnknownField {
                entity: self.table,
                field: name.to_string(),
            })
    }
}

/// Registers fields in declaration order.
pub struct FieldTableBuilder<E> {
    table: &'static str,
    fields: Vec<FieldAccessor<E>>,
}

impl<E: 'static> FieldTableBuilder<E> {
    pub fn field<T, G, S>(self, name: &'static str, get: G, set: S) -> Self
    where
        T: FieldType + 'static,
        G: Fn(&E) -> T + Send + Sync + 'static,
        S: Fn(&mut E, T) + Send + Sync + 'static,
    {
        self.push(name, FieldRole::Plain, get, set)
    }

    /// Registers a primary-key field supplied by the caller.
    pub fn key<T, G, S>(self, name: &'static str, get: G, set: S) -> Self
    where
        T: FieldType + 'static,
        G: Fn(&E) -> T + Send + Sync + 'static,
        S: Fn(&mut E, T) + Send + Sync + 'static,
    {
        self.push(name, FieldRole::Key, get, set)
    }

    /// Registers an integer primary key assigned by the store on insert
    /// whenever the record carries `0`.
    pub fn generated_key<G, S>(self, name: &'static str, get: G, set: S) -> Self
    where
        G: Fn(&E) -> i64 + Send + Sync + 'static,
        S: Fn(&mut E, i64) + Send + Sync + 'static,
    {
        self.push(name, FieldRole::GeneratedKey, get, set)
    }

    pub fn build(self) -> FieldTable<E> {
        FieldTable {
            table: self.table,
            fields: self.fields,
        }
    }

    fn push<T, G, S>(mut self, name: &'static str, role: FieldRole, get: G, set: S) -> Self
    where
        T: FieldType + 'static,
        G: Fn(&E) -> T + Send + Sync + 'static,
        S: Fn(&mut E, T) + Send + Sync + 'static,
    {
        self.fields.push(FieldAccessor {
            table: self.table,
            name,
            kind: T::KIND,
            nullable: T::NULLABLE,
            role,
            get: Box::new(move |record: &E| get(record).into_value()),
            set: Box::new(move |record: &mut E, value: FieldValue| match T::from_value(value.clone()) {
                Some(typed) => {
                    set(record, typed);
                    Ok(())
                }
                None => Err(value),
            }),
        });
        self
    }
}

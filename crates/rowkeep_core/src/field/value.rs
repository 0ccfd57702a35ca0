//! Typed field values and wire-string coercion.
//!
//! # Invariants
//! - Every value crossing the SQLite boundary is a `FieldValue`.
//! - Coercion precedence is date/time, then integer, then raw text.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, ToSql, ToSqlOutput, Value, ValueRef};
use std::fmt::{Display, Formatter};

const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage kind declared for an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Integer,
    Real,
    Text,
    Boolean,
    DateTime,
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::DateTime => "date/time",
        };
        f.write_str(name)
    }
}

/// Dynamically typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    DateTime(NaiveDateTime),
}

impl FieldValue {
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            Self::Null => None,
            Self::Integer(_) => Some(FieldKind::Integer),
            Self::Real(_) => Some(FieldKind::Real),
            Self::Text(_) => Some(FieldKind::Text),
            Self::Boolean(_) => Some(FieldKind::Boolean),
            Self::DateTime(_) => Some(FieldKind::DateTime),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short description used in type-mismatch errors.
    pub fn describe(&self) -> String {
        match self.kind() {
            Some(kind) => kind.to_string(),
            None => "null".to_string(),
        }
    }

    /// Reads a column value as the declared `kind`.
    pub(crate) fn from_column(value: ValueRef<'_>, kind: FieldKind) -> Result<Self, FromSqlError> {
        if matches!(value, ValueRef::Null) {
            return Ok(Self::Null);
        }
        match kind {
            FieldKind::Integer => i64::column_result(value).map(Self::Integer),
            FieldKind::Real => f64::column_result(value).map(Self::Real),
            FieldKind::Text => String::column_result(value).map(Self::Text),
            FieldKind::Boolean => bool::column_result(value).map(Self::Boolean),
            FieldKind::DateTime => NaiveDateTime::column_result(value).map(Self::DateTime),
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::DateTime(value) => write!(f, "{value}"),
        }
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Null => Ok(ToSqlOutput::Owned(Value::Null)),
            Self::Integer(value) => Ok(ToSqlOutput::Owned(Value::Integer(*value))),
            Self::Real(value) => Ok(ToSqlOutput::Owned(Value::Real(*value))),
            Self::Text(value) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes()))),
            Self::Boolean(value) => Ok(ToSqlOutput::Owned(Value::Integer(i64::from(*value)))),
            Self::DateTime(value) => value.to_sql(),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Coerces an untyped patch value.
///
/// The first interpretation that parses wins: a date/time value, then a
/// 64-bit integer, otherwise the raw string unchanged.
pub fn coerce_patch_value(raw: &str) -> FieldValue {
    let trimmed = raw.trim();
    if let Some(value) = parse_date_time(trimmed) {
        return FieldValue::DateTime(value);
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return FieldValue::Integer(value);
    }
    FieldValue::Text(raw.to_string())
}

fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::{coerce_patch_value, FieldKind, FieldValue};
    use chrono::NaiveDate;

    #[test]
    fn date_wins_over_integer_and_text() {
        let expected = NaiveDate::from_ymd_opt(2023, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            coerce_patch_value("2023-05-01"),
            FieldValue::DateTime(expected)
        );
    }

    #[test]
    fn date_time_forms_are_recognized() {
        let expected = NaiveDate::from_ymd_opt(2023, 5, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(
            coerce_patch_value("2023-05-01 08:30:00"),
            FieldValue::DateTime(expected)
        );
        assert_eq!(
            coerce_patch_value("2023-05-01T08:30:00"),
            FieldValue::DateTime(expected)
        );
        assert_eq!(
            coerce_patch_value("2023-05-01T10:30:00+02:00"),
            FieldValue::DateTime(expected)
        );
    }

    #[test]
    fn integers_come_second() {
        assert_eq!(coerce_patch_value("42"), FieldValue::Integer(42));
        assert_eq!(coerce_patch_value(" -7 "), FieldValue::Integer(-7));
    }

    #[test]
    fn everything_else_stays_raw() {
        assert_eq!(coerce_patch_value("abc"), FieldValue::Text("abc".into()));
        assert_eq!(coerce_patch_value("4.5"), FieldValue::Text("4.5".into()));
        assert_eq!(coerce_patch_value(""), FieldValue::Text(String::new()));
    }

    #[test]
    fn option_maps_none_to_null() {
        assert_eq!(FieldValue::from(None::<i64>), FieldValue::Null);
        assert_eq!(FieldValue::from(Some("x")).kind(), Some(FieldKind::Text));
    }
}

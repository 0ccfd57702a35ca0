//! SQL statements generated from entity field tables.
//!
//! All functions run synchronously on a borrowed connection; callers wrap them
//! in `StoreContext::io`.

use crate::field::{Entity, FieldAccessor, FieldValue, Filter};
use crate::model::SortDirection;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params_from_iter, Connection, Row};

/// Quotes an SQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `ORDER BY` target: a resolved field plus direction.
pub(crate) struct SortSpec<'a, E> {
    pub field: &'a FieldAccessor<E>,
    pub direction: SortDirection,
}

/// `LIMIT`/`OFFSET` window.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Window {
    pub limit: u64,
    pub offset: u64,
}

fn column_list<E: Entity>() -> String {
    E::field_table()
        .fields()
        .iter()
        .map(|field| quote_ident(field.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn key_order<E: Entity>() -> Vec<String> {
    E::field_table()
        .keys()
        .map(|key| format!("{} ASC", quote_ident(key.name())))
        .collect()
}

pub(crate) fn select<E: Entity>(
    conn: &Connection,
    filter: &Filter,
    sort: Option<SortSpec<'_, E>>,
    window: Option<Window>,
) -> RepoResult<Vec<E>> {
    let (where_sql, mut values) = filter.render::<E>()?;
    let mut sql = format!(
        "SELECT {} FROM {}{where_sql}",
        column_list::<E>(),
        quote_ident(E::table_name())
    );

    let mut order = Vec::new();
    if let Some(sort) = sort {
        order.push(format!(
            "{} {}",
            quote_ident(sort.field.name()),
            sort.direction.as_sql()
        ));
        order.extend(
            E::field_table()
                .keys()
                .filter(|key| key.name() != sort.field.name())
                .map(|key| format!("{} ASC", quote_ident(key.name()))),
        );
    } else if window.is_some() {
        order.extend(key_order::<E>());
    }
    if !order.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order.join(", "));
    }

    if let Some(window) = window {
        sql.push_str(" LIMIT ? OFFSET ?");
        values.push(FieldValue::Integer(to_sql_int(window.limit)));
        values.push(FieldValue::Integer(to_sql_int(window.offset)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(values.iter()))?;
    let mut records = Vec::new();

    while let Some(row) = rows.next()? {
        records.push(read_row::<E>(row)?);
    }

    Ok(records)
}

pub(crate) fn count<E: Entity>(conn: &Connection, filter: &Filter) -> RepoResult<u64> {
    let (where_sql, values) = filter.render::<E>()?;
    let sql = format!(
        "SELECT COUNT(*) FROM {}{where_sql}",
        quote_ident(E::table_name())
    );
    let total: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
    u64::try_from(total).map_err(|_| RepoError::InvalidData(format!("negative count {total}")))
}

pub(crate) fn exists<E: Entity>(conn: &Connection, filter: &Filter) -> RepoResult<bool> {
    let (where_sql, values) = filter.render::<E>()?;
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {}{where_sql})",
        quote_ident(E::table_name())
    );
    let found: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
    Ok(found == 1)
}

pub(crate) fn max<E: Entity>(conn: &Connection, field: &FieldAccessor<E>) -> RepoResult<Option<i64>> {
    let sql = format!(
        "SELECT MAX({}) FROM {}",
        quote_ident(field.name()),
        quote_ident(E::table_name())
    );
    let value: Option<i64> = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(value)
}

/// Inserts `record`, assigning its generated key when the store picks one.
pub(crate) fn insert<E: Entity>(conn: &Connection, record: &mut E) -> RepoResult<()> {
    let table = E::field_table();
    let mut columns = Vec::new();
    let mut values = Vec::new();
    let mut store_assigns_key = false;

    for field in table.fields() {
        let value = field.get(record);
        if field.is_generated() && matches!(value, FieldValue::Null | FieldValue::Integer(0)) {
            store_assigns_key = true;
            continue;
        }
        columns.push(quote_ident(field.name()));
        values.push(value);
    }

    let sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table.table()))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table.table()),
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        )
    };

    let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
    if changed == 0 {
        return Err(RepoError::NoRowsAffected {
            entity: table.table(),
            operation: "insert",
        });
    }

    if store_assigns_key {
        if let Some(key) = table.generated_key() {
            key.set(record, FieldValue::Integer(conn.last_insert_rowid()))?;
        }
    }
    Ok(())
}

/// Replaces every column of the row matching `record`'s key.
pub(crate) fn update<E: Entity>(conn: &Connection, record: &E) -> RepoResult<()> {
    let table = E::field_table();
    let key = Filter::matching_key(record)?;
    let (where_sql, key_values) = key.render::<E>()?;

    let assignments = table
        .fields()
        .iter()
        .map(|field| format!("{} = ?", quote_ident(field.name())))
        .collect::<Vec<_>>()
        .join(", ");
    let mut values: Vec<FieldValue> = table.fields().iter().map(|field| field.get(record)).collect();
    values.extend(key_values);

    let sql = format!(
        "UPDATE {} SET {assignments}{where_sql}",
        quote_ident(table.table())
    );
    let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
    if changed == 0 {
        return Err(RepoError::NoRowsAffected {
            entity: table.table(),
            operation: "update",
        });
    }
    Ok(())
}

/// Writes a single column of the row selected by `key`.
pub(crate) fn update_column<E: Entity>(
    conn: &Connection,
    field: &FieldAccessor<E>,
    value: &FieldValue,
    key: &Filter,
) -> RepoResult<()> {
    let (where_sql, key_values) = key.render::<E>()?;
    let sql = format!(
        "UPDATE {} SET {} = ?{where_sql}",
        quote_ident(E::table_name()),
        quote_ident(field.name())
    );

    let mut values = Vec::with_capacity(key_values.len() + 1);
    values.push(value.clone());
    values.extend(key_values);

    let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
    if changed == 0 {
        return Err(RepoError::NoRowsAffected {
            entity: E::table_name(),
            operation: "patch",
        });
    }
    Ok(())
}

/// Deletes the row matching `record`'s key.
///
/// Returns `false` without touching the store when the row is already gone.
pub(crate) fn delete<E: Entity>(conn: &Connection, record: &E) -> RepoResult<bool> {
    let key = Filter::matching_key(record)?;
    if !exists::<E>(conn, &key)? {
        return Ok(false);
    }

    let (where_sql, values) = key.render::<E>()?;
    let sql = format!("DELETE FROM {}{where_sql}", quote_ident(E::table_name()));
    let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
    if changed == 0 {
        return Err(RepoError::NoRowsAffected {
            entity: E::table_name(),
            operation: "delete",
        });
    }
    Ok(true)
}

fn read_row<E: Entity>(row: &Row<'_>) -> RepoResult<E> {
    let table = E::field_table();
    let mut record = E::default();

    for (index, field) in table.fields().iter().enumerate() {
        let raw = row.get_ref(index)?;
        let value = FieldValue::from_column(raw, field.kind()).map_err(|err| {
            RepoError::InvalidData(format!(
                "cannot read `{}.{}` as {}: {err}",
                table.table(),
                field.name(),
                field.kind()
            ))
        })?;
        field
            .set(&mut record, value)
            .map_err(|err| RepoError::InvalidData(err.to_string()))?;
    }

    Ok(record)
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

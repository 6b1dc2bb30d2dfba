#![allow(
    clippy::redundant_pub_crate,
    reason = "migrations module is private, pub(crate) is intentional"
)]

mod column_helpers;
mod v1;

use column_helpers::{
    foreign_keys, index_columns, index_table, table_columns, trigger_table, unique_index_columns,
};
use rusqlite::Connection;

use crate::error::StorageError;
use crate::schema::{
    normalize_type, ForeignKeyShape, TableShape, UniqueShape, FOREIGN_KEYS, INDEXES, TABLES,
    UNIQUE_KEYS, UPDATED_AT_TRIGGER,
};

pub const SCHEMA_VERSION: i32 = 1;

/// Create missing tables, indexes and the `updated_at` trigger, then verify
/// that whatever already existed has the expected shape.
///
/// Safe to run on every start: existing structures are left untouched and a
/// second run is a no-op. Runs in one transaction, so a drift error leaves
/// the database as it was.
pub fn ensure_schema(conn: &Connection) -> Result<(), StorageError> {
    let current_version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    tracing::info!("Database schema version: {} (target: {})", current_version, SCHEMA_VERSION);

    if current_version > SCHEMA_VERSION {
        return Err(StorageError::drift(
            "database",
            format!("schema version {current_version} is newer than supported {SCHEMA_VERSION}"),
        ));
    }

    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(v1::TABLES_SQL)?;
    for table in TABLES {
        verify_table(&tx, table)?;
    }
    for key in &UNIQUE_KEYS {
        verify_unique(&tx, key)?;
    }
    for fk in &FOREIGN_KEYS {
        verify_foreign_key(&tx, fk)?;
    }

    for index in &INDEXES {
        tx.execute_batch(&index.create_sql())?;
        let owner = index_table(&tx, index.name)?;
        let columns = index_columns(&tx, index.name)?;
        if owner.as_deref() != Some(index.table) || columns != [index.column] {
            return Err(StorageError::drift(
                index.table,
                format!(
                    "index {} covers {:?} on {:?}, expected ({}) on {}",
                    index.name, columns, owner, index.column, index.table
                ),
            ));
        }
    }

    tx.execute_batch(v1::TRIGGER_SQL)?;
    if trigger_table(&tx, UPDATED_AT_TRIGGER)?.as_deref() != Some("users") {
        return Err(StorageError::drift(
            "users",
            format!("trigger {UPDATED_AT_TRIGGER} is attached to another table"),
        ));
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!("Running migration v1: users, chat_sessions, messages");
        tx.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(|e| StorageError::Migration(format!("recording schema version: {e}")))?;
    }

    tx.commit()?;
    Ok(())
}

fn verify_table(conn: &Connection, shape: &TableShape) -> Result<(), StorageError> {
    let live = table_columns(conn, shape.name)?;

    for expected in shape.columns {
        let Some(column) = live.iter().find(|c| c.name.eq_ignore_ascii_case(expected.name)) else {
            return Err(StorageError::drift(
                shape.name,
                format!("missing column {}", expected.name),
            ));
        };

        let declared = normalize_type(&column.declared_type);
        if declared != expected.sqlite_type {
            return Err(StorageError::drift(
                shape.name,
                format!(
                    "column {} has type {}, expected {}",
                    expected.name, column.declared_type, expected.sqlite_type
                ),
            ));
        }

        if expected.primary_key && !column.primary_key {
            return Err(StorageError::drift(
                shape.name,
                format!("column {} is not the primary key", expected.name),
            ));
        }

        if expected.required && !expected.primary_key && !column.not_null {
            return Err(StorageError::drift(
                shape.name,
                format!("column {} must be NOT NULL", expected.name),
            ));
        }
    }

    let is_expected = |name: &str| shape.columns.iter().any(|e| name.eq_ignore_ascii_case(e.name));
    for extra in live.iter().filter(|c| !is_expected(&c.name)) {
        tracing::debug!(table = shape.name, column = %extra.name, "ignoring extra column");
    }

    Ok(())
}

fn verify_unique(conn: &Connection, key: &UniqueShape) -> Result<(), StorageError> {
    let covered = unique_index_columns(conn, key.table)?.iter().any(|columns| {
        matches!(columns.as_slice(), [only] if only.eq_ignore_ascii_case(key.column))
    });
    if covered {
        Ok(())
    } else {
        Err(StorageError::drift(key.table, format!("column {} is not UNIQUE", key.column)))
    }
}

fn verify_foreign_key(conn: &Connection, fk: &ForeignKeyShape) -> Result<(), StorageError> {
    let declared = foreign_keys(conn, fk.table)?.iter().any(|info| {
        info.column.eq_ignore_ascii_case(fk.column)
            && info.parent.eq_ignore_ascii_case(fk.parent)
            && info
                .parent_column
                .as_deref()
                .is_none_or(|column| column.eq_ignore_ascii_case(fk.parent_column))
    });
    if declared {
        Ok(())
    } else {
        Err(StorageError::drift(
            fk.table,
            format!("column {} does not reference {}({})", fk.column, fk.parent, fk.parent_column),
        ))
    }
}

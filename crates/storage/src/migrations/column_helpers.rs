use rusqlite::{Connection, OptionalExtension as _};

/// One row of `PRAGMA table_info`.
#[derive(Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>, rusqlite::Error> {
    let sql = format!("PRAGMA table_info({table})");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(ColumnInfo {
            name: row.get(1)?,
            declared_type: row.get(2)?,
            not_null: row.get::<_, i64>(3)? != 0,
            primary_key: row.get::<_, i64>(5)? != 0,
        })
    })?;
    rows.collect()
}

/// Column names covered by an index, in key order. Empty if the index does not exist.
pub fn index_columns(conn: &Connection, index: &str) -> Result<Vec<String>, rusqlite::Error> {
    let sql = format!("PRAGMA index_info({index})");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(2))?;
    rows.collect()
}

/// Table an index is attached to, if the index exists.
pub fn index_table(conn: &Connection, index: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT tbl_name FROM sqlite_master WHERE type = 'index' AND name = ?1",
        [index],
        |row| row.get(0),
    )
    .optional()
}

pub fn trigger_table(conn: &Connection, trigger: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT tbl_name FROM sqlite_master WHERE type = 'trigger' AND name = ?1",
        [trigger],
        |row| row.get(0),
    )
    .optional()
}

/// Key columns of every full (non-partial) unique index on `table`.
pub fn unique_index_columns(
    conn: &Connection,
    table: &str,
) -> Result<Vec<Vec<String>>, rusqlite::Error> {
    let sql = format!("PRAGMA index_list({table})");
    let mut stmt = conn.prepare(&sql)?;
    let names = stmt
        .query_map([], |row| {
            let name: String = row.get("name")?;
            let unique = row.get::<_, i64>("unique")? != 0;
            let partial = row.get::<_, i64>("partial")? != 0;
            Ok((unique && !partial).then_some(name))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    names.into_iter().flatten().map(|name| index_columns(conn, &name)).collect()
}

/// One single-column reference from `PRAGMA foreign_key_list`.
#[derive(Debug)]
pub struct ForeignKeyInfo {
    pub column: String,
    pub parent: String,
    /// `None` when the key names only the parent table (its primary key).
    pub parent_column: Option<String>,
}

/// Single-column foreign keys declared on `table`; composite keys are skipped.
pub fn foreign_keys(
    conn: &Connection,
    table: &str,
) -> Result<Vec<ForeignKeyInfo>, rusqlite::Error> {
    let sql = format!("PRAGMA foreign_key_list({table})");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            let id: i64 = row.get("id")?;
            let info = ForeignKeyInfo {
                column: row.get("from")?,
                parent: row.get("table")?,
                parent_column: row.get("to")?,
            };
            Ok((id, info))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let ids: Vec<i64> = rows.iter().map(|(id, _)| *id).collect();
    Ok(rows
        .into_iter()
        .filter(|(id, _)| ids.iter().filter(|other| *other == id).count() == 1)
        .map(|(_, info)| info)
        .collect())
}

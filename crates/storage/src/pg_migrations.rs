//! PostgreSQL schema installation and drift checks.

use botstore_core::{Operation, PERMISSIVE_GRANTS, Table};
use sqlx::{PgConnection, PgPool, Row as _};

use crate::error::StorageError;
use crate::schema::{
    FOREIGN_KEYS, ForeignKeyShape, INDEXES, IndexShape, TABLES, TableShape, UNIQUE_KEYS,
    UPDATED_AT_TRIGGER, UniqueShape,
};

/// Serializes concurrent `ensure_schema` runs across processes.
const SCHEMA_LOCK_KEY: i64 = 0x626f_7473_746f_7265;

const USERS_SQL: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id SERIAL PRIMARY KEY,
    telegram_id VARCHAR(50) NOT NULL UNIQUE CHECK (telegram_id <> ''),
    username VARCHAR(100),
    first_name VARCHAR(100),
    last_name VARCHAR(100),
    complexity_level VARCHAR(20) NOT NULL DEFAULT 'medium',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

const CHAT_SESSIONS_SQL: &str = r"
CREATE TABLE IF NOT EXISTS chat_sessions (
    id SERIAL PRIMARY KEY,
    user_id INTEGER REFERENCES users(id),
    session_id VARCHAR(100) NOT NULL UNIQUE CHECK (session_id <> ''),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    is_active BOOLEAN NOT NULL DEFAULT TRUE
)";

const MESSAGES_SQL: &str = r"
CREATE TABLE IF NOT EXISTS messages (
    id SERIAL PRIMARY KEY,
    session_id VARCHAR(100) NOT NULL CHECK (session_id <> ''),
    user_message TEXT NOT NULL,
    bot_response TEXT NOT NULL,
    sources TEXT,
    complexity_level VARCHAR(20),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

const TRIGGER_FUNCTION_SQL: &str = r"
DO $do$ BEGIN
    IF NOT EXISTS (
        SELECT 1 FROM pg_proc p
          JOIN pg_namespace n ON n.oid = p.pronamespace
         WHERE p.proname = 'update_updated_at_column' AND n.nspname = current_schema()
    ) THEN
        CREATE FUNCTION update_updated_at_column() RETURNS TRIGGER AS $fn$
        BEGIN
            NEW.updated_at := GREATEST(NOW(), OLD.updated_at);
            RETURN NEW;
        END;
        $fn$ LANGUAGE plpgsql;
    END IF;
END $do$";

const TRIGGER_SQL: &str = r"
DO $do$ BEGIN
    IF NOT EXISTS (
        SELECT 1 FROM pg_trigger
         WHERE tgname = 'update_users_updated_at' AND tgrelid = 'users'::regclass
    ) THEN
        CREATE TRIGGER update_users_updated_at
            BEFORE UPDATE ON users
            FOR EACH ROW EXECUTE FUNCTION update_updated_at_column();
    END IF;
END $do$";

/// Create missing structures and verify the existing ones, in one transaction.
pub async fn ensure_pg_schema(pool: &PgPool) -> Result<(), StorageError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    for ddl in [USERS_SQL, CHAT_SESSIONS_SQL, MESSAGES_SQL] {
        sqlx::query(ddl).execute(&mut *tx).await?;
    }
    for table in TABLES {
        verify_table(&mut *tx, table).await?;
    }
    for key in &UNIQUE_KEYS {
        verify_unique(&mut *tx, key).await?;
    }
    for fk in &FOREIGN_KEYS {
        verify_foreign_key(&mut *tx, fk).await?;
    }

    for index in &INDEXES {
        sqlx::query(&index.create_sql()).execute(&mut *tx).await?;
        verify_index(&mut *tx, index).await?;
    }

    sqlx::query(TRIGGER_FUNCTION_SQL).execute(&mut *tx).await?;
    sqlx::query(TRIGGER_SQL).execute(&mut *tx).await?;
    let trigger_present: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM pg_trigger WHERE tgname = $1 AND tgrelid = 'users'::regclass
        )",
    )
    .bind(UPDATED_AT_TRIGGER)
    .fetch_one(&mut *tx)
    .await?;
    if !trigger_present {
        return Err(StorageError::drift("users", format!("trigger {UPDATED_AT_TRIGGER} missing")));
    }

    for table in [Table::Users, Table::ChatSessions, Table::Messages] {
        sqlx::query(&format!("ALTER TABLE {table} ENABLE ROW LEVEL SECURITY"))
            .execute(&mut *tx)
            .await?;
    }
    for &(table, operation) in PERMISSIVE_GRANTS {
        sqlx::query(&policy_sql(table, operation)).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    tracing::info!("PostgreSQL schema ensured");
    Ok(())
}

pub(crate) fn policy_name(table: Table, operation: Operation) -> String {
    format!("allow_{}_{}", operation.as_sql().to_lowercase(), table)
}

/// Always-true policy for one grant, created only if absent.
pub(crate) fn policy_sql(table: Table, operation: Operation) -> String {
    let clause = match operation {
        Operation::Insert => "WITH CHECK (true)",
        Operation::Update => "USING (true) WITH CHECK (true)",
        Operation::Select | Operation::Delete => "USING (true)",
    };
    let name = policy_name(table, operation);
    format!(
        "DO $do$ BEGIN
            IF NOT EXISTS (
                SELECT 1 FROM pg_policies
                 WHERE schemaname = current_schema()
                   AND tablename = '{table}'
                   AND policyname = '{name}'
            ) THEN
                CREATE POLICY {name} ON {table} FOR {op} {clause};
            END IF;
        END $do$",
        op = operation.as_sql(),
    )
}

async fn verify_table(conn: &mut PgConnection, shape: &TableShape) -> Result<(), StorageError> {
    let rows = sqlx::query(
        "SELECT column_name::text AS column_name,
                data_type::text AS data_type,
                is_nullable::text AS is_nullable,
                character_maximum_length::int4 AS max_len
           FROM information_schema.columns
          WHERE table_schema = current_schema() AND table_name = $1",
    )
    .bind(shape.name)
    .fetch_all(&mut *conn)
    .await?;

    for expected in shape.columns {
        let Some(row) = rows.iter().find(|r| {
            r.try_get::<String, _>("column_name").is_ok_and(|n| n == expected.name)
        }) else {
            return Err(StorageError::drift(
                shape.name,
                format!("missing column {}", expected.name),
            ));
        };

        let data_type: String = row.try_get("data_type")?;
        if data_type != expected.pg_type {
            return Err(StorageError::drift(
                shape.name,
                format!(
                    "column {} has type {data_type}, expected {}",
                    expected.name, expected.pg_type
                ),
            ));
        }

        let max_len: Option<i32> = row.try_get("max_len")?;
        if let (Some(want), Some(have)) = (expected.max_len, max_len)
            && have < want
        {
            return Err(StorageError::drift(
                shape.name,
                format!(
                    "column {} is limited to {have} characters, expected {want}",
                    expected.name
                ),
            ));
        }

        let is_nullable: String = row.try_get("is_nullable")?;
        if expected.required && is_nullable == "YES" {
            return Err(StorageError::drift(
                shape.name,
                format!("column {} must be NOT NULL", expected.name),
            ));
        }
    }

    Ok(())
}

async fn verify_unique(conn: &mut PgConnection, key: &UniqueShape) -> Result<(), StorageError> {
    let covered: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM pg_constraint c
              JOIN pg_class t ON t.oid = c.conrelid
              JOIN pg_namespace n ON n.oid = t.relnamespace
              JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = c.conkey[1]
             WHERE n.nspname = current_schema()
               AND c.contype IN ('u', 'p')
               AND cardinality(c.conkey) = 1
               AND t.relname = $1
               AND a.attname = $2
        )",
    )
    .bind(key.table)
    .bind(key.column)
    .fetch_one(&mut *conn)
    .await?;

    if !covered {
        return Err(StorageError::drift(key.table, format!("column {} is not UNIQUE", key.column)));
    }
    Ok(())
}

async fn verify_foreign_key(
    conn: &mut PgConnection,
    fk: &ForeignKeyShape,
) -> Result<(), StorageError> {
    let declared: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM pg_constraint c
              JOIN pg_class t ON t.oid = c.conrelid
              JOIN pg_class p ON p.oid = c.confrelid
              JOIN pg_namespace n ON n.oid = t.relnamespace
              JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = c.conkey[1]
              JOIN pg_attribute pa ON pa.attrelid = p.oid AND pa.attnum = c.confkey[1]
             WHERE n.nspname = current_schema()
               AND c.contype = 'f'
               AND cardinality(c.conkey) = 1
               AND t.relname = $1
               AND a.attname = $2
               AND p.relname = $3
               AND pa.attname = $4
        )",
    )
    .bind(fk.table)
    .bind(fk.column)
    .bind(fk.parent)
    .bind(fk.parent_column)
    .fetch_one(&mut *conn)
    .await?;

    if !declared {
        return Err(StorageError::drift(
            fk.table,
            format!("column {} does not reference {}({})", fk.column, fk.parent, fk.parent_column),
        ));
    }
    Ok(())
}

async fn verify_index(conn: &mut PgConnection, index: &IndexShape) -> Result<(), StorageError> {
    let row = sqlx::query(
        "SELECT tablename::text AS tablename, indexdef FROM pg_indexes
          WHERE schemaname = current_schema() AND indexname = $1",
    )
    .bind(index.name)
    .fetch_optional(&mut *conn)
    .await?;

    let matches = match &row {
        Some(row) => {
            let table: String = row.try_get("tablename")?;
            let def: String = row.try_get("indexdef")?;
            table == index.table && def.ends_with(&format!("({})", index.column))
        },
        None => false,
    };
    if !matches {
        return Err(StorageError::drift(
            index.table,
            format!("index {} does not cover ({})", index.name, index.column),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_per_grant_has_unique_name() {
        let mut names: Vec<String> =
            PERMISSIVE_GRANTS.iter().map(|&(t, o)| policy_name(t, o)).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), PERMISSIVE_GRANTS.len());
    }

    #[test]
    fn insert_policy_uses_with_check() {
        let sql = policy_sql(Table::Messages, Operation::Insert);
        assert!(sql.contains(
            "CREATE POLICY allow_insert_messages ON messages FOR INSERT WITH CHECK (true)"
        ));
    }

    #[test]
    fn messages_have_no_update_policy() {
        assert!(!PERMISSIVE_GRANTS.contains(&(Table::Messages, Operation::Update)));
    }
}

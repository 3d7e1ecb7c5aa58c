//! SQLite store backend.
//!
//! Each [`Store::connect`] opens a fresh `SqliteConnection`; nothing is
//! pooled, matching the one-connection-per-query lifetime the executor
//! guarantees. Rows decode into [`Value`]s by storage class, so results
//! stay schema-opaque. Writes go through [`SqliteStore::execute_batch`],
//! which wraps the statement list in a single transaction: commit on
//! success, rollback on the first error.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{ConnectOptions, Connection, Row as SqlxRow, TypeInfo, ValueRef};
use tracing::debug;

use crate::error::{FetchError, Result};
use crate::query::{Query, ResultSet, Row, Value};
use crate::store::{Store, StoreConnection};

/// A SQLite database file acting as the data store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    create_if_missing: bool,
}

impl SqliteStore {
    /// Point at an existing database file. Connecting fails if the file
    /// does not exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_if_missing: false,
        }
    }

    /// Allow connections to create the database file (seed flows).
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(self.create_if_missing)
    }

    /// Run one write statement over a scoped connection, returning the
    /// number of affected rows.
    pub async fn execute(&self, statement: &Query) -> Result<u64> {
        self.execute_batch(std::slice::from_ref(statement)).await
    }

    /// Run `statements` inside one transaction over a scoped connection.
    ///
    /// Commits only if every statement succeeds; the first error rolls
    /// the whole batch back and is propagated. Returns the total number
    /// of affected rows.
    pub async fn execute_batch(&self, statements: &[Query]) -> Result<u64> {
        let mut handle = self.connect().await?;
        let result = run_batch(&mut handle.conn, statements).await;
        match result {
            Ok(affected) => {
                handle.close().await?;
                Ok(affected)
            }
            Err(err) => {
                if let Err(release_err) = handle.close().await {
                    debug!(error = %release_err, "release failed after batch error");
                }
                Err(err)
            }
        }
    }
}

async fn run_batch(conn: &mut SqliteConnection, statements: &[Query]) -> Result<u64> {
    let mut tx = conn
        .begin()
        .await
        .map_err(|err| FetchError::query("BEGIN", err))?;

    let mut affected = 0u64;
    for statement in statements {
        let mut prepared = sqlx::query(statement.sql());
        for value in statement.params() {
            prepared = bind_value(prepared, value);
        }
        let outcome = prepared
            .execute(&mut *tx)
            .await
            .map_err(|err| FetchError::query(statement.sql(), err))?;
        affected += outcome.rows_affected();
    }

    // Dropping an uncommitted sqlx transaction rolls it back, which is
    // what the early returns above rely on.
    tx.commit()
        .await
        .map_err(|err| FetchError::query("COMMIT", err))?;
    Ok(affected)
}

/// One open SQLite session, released explicitly (or on drop when a fetch
/// is cancelled).
pub struct SqliteStoreConnection {
    conn: SqliteConnection,
    store: String,
}

#[async_trait]
impl Store for SqliteStore {
    type Conn = SqliteStoreConnection;

    async fn connect(&self) -> Result<SqliteStoreConnection> {
        let store = self.describe();
        let options = self.options();
        let conn = options
            .connect()
            .await
            .map_err(|err| FetchError::connection(store.clone(), err))?;
        Ok(SqliteStoreConnection { conn, store })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[async_trait]
impl StoreConnection for SqliteStoreConnection {
    async fn fetch_all(&mut self, query: &Query) -> Result<ResultSet> {
        let mut prepared = sqlx::query(query.sql());
        for value in query.params() {
            prepared = bind_value(prepared, value);
        }

        let rows = prepared
            .fetch_all(&mut self.conn)
            .await
            .map_err(|err| FetchError::query(query.sql(), err))?;

        rows.iter().map(|row| decode_row(row, query.sql())).collect()
    }

    async fn close(self) -> Result<()> {
        let Self { conn, store } = self;
        conn.close()
            .await
            .map_err(|err| FetchError::release(store, err))
    }
}

fn bind_value<'q>(
    prepared: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => prepared.bind(None::<i64>),
        Value::Integer(n) => prepared.bind(*n),
        Value::Real(x) => prepared.bind(*x),
        Value::Text(s) => prepared.bind(s.clone()),
        Value::Blob(bytes) => prepared.bind(bytes.clone()),
    }
}

fn decode_row(row: &SqliteRow, sql: &str) -> Result<Row> {
    let mut values = Vec::with_capacity(row.columns().len());
    for idx in 0..row.columns().len() {
        values.push(decode_column(row, idx, sql)?);
    }
    Ok(Row(values))
}

fn decode_column(row: &SqliteRow, idx: usize, sql: &str) -> Result<Value> {
    let raw = row
        .try_get_raw(idx)
        .map_err(|err| FetchError::query(sql, err))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let type_name = raw.type_info().name().to_string();
    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Value::Integer(
            row.try_get::<i64, _>(idx)
                .map_err(|err| FetchError::query(sql, err))?,
        ),
        "REAL" => Value::Real(
            row.try_get::<f64, _>(idx)
                .map_err(|err| FetchError::query(sql, err))?,
        ),
        "BLOB" => Value::Blob(
            row.try_get::<Vec<u8>, _>(idx)
                .map_err(|err| FetchError::query(sql, err))?,
        ),
        // TEXT and the text-affinity declared types (DATETIME etc.)
        _ => Value::Text(
            row.try_get::<String, _>(idx)
                .map_err(|err| FetchError::query(sql, err))?,
        ),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::fetch_one;

    #[tokio::test]
    async fn decodes_every_storage_class() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("types.db")).create_if_missing(true);

        let rows = fetch_one(
            &store,
            &Query::new("SELECT NULL, 42, 2.5, 'hi', x'0102'"),
        )
        .await
        .unwrap();

        assert_eq!(
            rows,
            vec![Row(vec![
                Value::Null,
                Value::Integer(42),
                Value::Real(2.5),
                Value::Text("hi".to_string()),
                Value::Blob(vec![1, 2]),
            ])]
        );
    }

    #[tokio::test]
    async fn missing_database_is_a_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("absent.db"));

        let err = fetch_one(&store, &Query::new("SELECT 1")).await.unwrap_err();
        assert!(matches!(err, FetchError::Connection { .. }));
    }

    #[tokio::test]
    async fn bad_sql_is_a_query_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("bad.db")).create_if_missing(true);

        let err = fetch_one(&store, &Query::new("SELECT * FROM no_such_table"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Query { .. }));
    }
}

//! # SQLite Driver
//!
//! The only place that talks to sqlx. Everything above it speaks
//! `(sql, params, mode)` in and JSON-shaped records out.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Driver::execute                                  │
//! │                                                                         │
//! │  sql + &[Value] + ExecMode                                              │
//! │       │                                                                 │
//! │       ├── ExecMode::All ──► DriverOutput::Rows(Vec<Record>)             │
//! │       ├── ExecMode::Get ──► DriverOutput::Row(Option<Record>)           │
//! │       └── ExecMode::Run ──► DriverOutput::Done(RunResult)               │
//! │                              { last_insert_id, rows_affected }          │
//! │                                                                         │
//! │  BEGIN / COMMIT / ROLLBACK travel the same path with ExecMode::Run.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## One Connection
//! SQLite transactions belong to a connection. The driver owns exactly one
//! `SqliteConnection` behind an async mutex, so every statement issued
//! between `BEGIN` and `COMMIT` lands on the same connection.

use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteRow,
};
use sqlx::{Column, ConnectOptions, Row, TypeInfo, ValueRef};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, trace};

use crate::config::DbConfig;
use crate::error::{DbError, DbResult};

/// A result row with storage-case column names.
pub type Record = Map<String, Value>;

/// How a statement's result is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Every row.
    All,
    /// First row, if any.
    Get,
    /// No rows; report insert id and affected count.
    Run,
}

/// Outcome of a `Run` statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunResult {
    pub last_insert_id: i64,
    pub rows_affected: u64,
}

/// What a driver returns, shaped by the [`ExecMode`] it was given.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverOutput {
    Rows(Vec<Record>),
    Row(Option<Record>),
    Done(RunResult),
}

impl DriverOutput {
    pub fn into_rows(self) -> Vec<Record> {
        match self {
            DriverOutput::Rows(rows) => rows,
            DriverOutput::Row(row) => row.into_iter().collect(),
            DriverOutput::Done(_) => Vec::new(),
        }
    }

    pub fn into_row(self) -> Option<Record> {
        match self {
            DriverOutput::Rows(rows) => rows.into_iter().next(),
            DriverOutput::Row(row) => row,
            DriverOutput::Done(_) => None,
        }
    }

    pub fn into_run_result(self) -> RunResult {
        match self {
            DriverOutput::Done(result) => result,
            _ => RunResult::default(),
        }
    }
}

/// Executes parametrized SQL.
#[async_trait]
pub trait Driver: Send + Sync + fmt::Debug {
    async fn execute(&self, sql: &str, params: &[Value], mode: ExecMode) -> DbResult<DriverOutput>;
}

// =============================================================================
// SQLite Implementation
// =============================================================================

/// [`Driver`] over a single sqlx SQLite connection.
pub struct SqliteDriver {
    conn: Mutex<SqliteConnection>,
}

impl fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteDriver").finish_non_exhaustive()
    }
}

impl SqliteDriver {
    /// Opens the connection described by `config`.
    ///
    /// ## What This Does
    /// 1. Creates the database file if allowed and missing
    /// 2. Enables foreign keys and the busy timeout
    /// 3. Switches to WAL for file databases when configured
    pub async fn connect(config: &DbConfig) -> DbResult<Self> {
        let options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            let options = SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(config.create_if_missing);
            if config.journal_wal {
                options.journal_mode(SqliteJournalMode::Wal)
            } else {
                options
            }
        };

        let options = options
            .foreign_keys(config.foreign_keys)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

        let conn = options
            .connect()
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(path = %config.database_path.display(), "SQLite connection opened");

        Ok(SqliteDriver {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    async fn execute(&self, sql: &str, params: &[Value], mode: ExecMode) -> DbResult<DriverOutput> {
        trace!(sql, params = params.len(), ?mode, "execute");

        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_value(query, param);
        }

        let mut conn = self.conn.lock().await;
        let output = match mode {
            ExecMode::All => {
                let rows = query.fetch_all(&mut *conn).await?;
                DriverOutput::Rows(rows.iter().map(decode_row).collect::<DbResult<_>>()?)
            }
            ExecMode::Get => {
                let row = query.fetch_optional(&mut *conn).await?;
                DriverOutput::Row(row.as_ref().map(decode_row).transpose()?)
            }
            ExecMode::Run => {
                let done = query.execute(&mut *conn).await?;
                DriverOutput::Done(RunResult {
                    last_insert_id: done.last_insert_rowid(),
                    rows_affected: done.rows_affected(),
                })
            }
        };

        Ok(output)
    }
}

/// Binds one JSON parameter by its natural SQLite type.
///
/// Arrays and objects have no SQLite counterpart and are bound as JSON text.
fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else {
                query.bind(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Decodes a row by the storage class of each value.
fn decode_row(row: &SqliteRow) -> DbResult<Record> {
    let mut record = Record::new();

    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_string();
            match type_name.as_str() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
                "REAL" | "NUMERIC" => {
                    let f = row.try_get_unchecked::<f64, _>(index)?;
                    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
                }
                "BLOB" => Value::from(row.try_get_unchecked::<Vec<u8>, _>(index)?),
                _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
            }
        };

        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn driver() -> SqliteDriver {
        SqliteDriver::connect(&DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_run_reports_insert_id_and_affected_rows() {
        let driver = driver().await;
        driver
            .execute(
                "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)",
                &[],
                ExecMode::Run,
            )
            .await
            .unwrap();

        let done = driver
            .execute("INSERT INTO t (name) VALUES (?)", &[json!("a")], ExecMode::Run)
            .await
            .unwrap()
            .into_run_result();
        assert_eq!(done.last_insert_id, 1);
        assert_eq!(done.rows_affected, 1);

        let done = driver
            .execute("UPDATE t SET name = ? WHERE id = ?", &[json!("b"), json!(99)], ExecMode::Run)
            .await
            .unwrap()
            .into_run_result();
        assert_eq!(done.rows_affected, 0);
    }

    #[tokio::test]
    async fn test_values_decode_by_storage_class() {
        let driver = driver().await;
        let row = driver
            .execute(
                "SELECT 1 AS i, 2.5 AS r, 'x' AS t, NULL AS n, X'0102' AS b, ? AS bound, ? AS flag",
                &[json!({ "k": 1 }), json!(true)],
                ExecMode::Get,
            )
            .await
            .unwrap()
            .into_row()
            .unwrap();

        assert_eq!(row["i"], json!(1));
        assert_eq!(row["r"], json!(2.5));
        assert_eq!(row["t"], json!("x"));
        assert_eq!(row["n"], Value::Null);
        assert_eq!(row["b"], json!([1, 2]));
        assert_eq!(row["bound"], json!("{\"k\":1}"));
        assert_eq!(row["flag"], json!(1));
    }

    #[tokio::test]
    async fn test_get_on_empty_result_is_none() {
        let driver = driver().await;
        let row = driver
            .execute("SELECT 1 WHERE 0", &[], ExecMode::Get)
            .await
            .unwrap();
        assert_eq!(row, DriverOutput::Row(None));
    }

    #[tokio::test]
    async fn test_syntax_error_propagates() {
        let driver = driver().await;
        let err = driver
            .execute("SELEC nothing", &[], ExecMode::All)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::QueryFailed(_)));
    }
}

//! # Database Handle
//!
//! The single long-lived connection, shared by every repository.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Handle                                    │
//! │                                                                         │
//! │  App Startup (composition root)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::load(None)? ← file + env                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::open(&config).await?                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                            │
//! │  │  Database (Clone = cheap Arc copies)    │                            │
//! │  │  ├── Arc<dyn Driver>  one connection    │                            │
//! │  │  ├── in_transaction   shared flag       │                            │
//! │  │  └── SearchSettings                     │                            │
//! │  └─────────────────────────────────────────┘                            │
//! │       │                                                                 │
//! │       ├──► db.products()    Repository<Product>                         │
//! │       ├──► db.categories()  Repository<Category>                        │
//! │       ├──► db.sales()       Repository<Sale>                            │
//! │       └──► db.sale_items()  Repository<SaleItem>                        │
//! │                                                                         │
//! │  Every clone sees the same connection and the same transaction flag.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use penny_core::types::{Category, Product, Sale, SaleItem};
use penny_core::validation::validate_identifier;

use crate::config::{DbConfig, SearchSettings};
use crate::driver::{Driver, DriverOutput, ExecMode, Record, RunResult, SqliteDriver};
use crate::error::{DbError, DbResult};
use crate::query::QueryBuilder;
use crate::repository::{Repository, TableMetadata};

/// Main database handle.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::open(&DbConfig::load(None)?).await?;
/// let page = db.products().search_page(&PageParams::search("cola", &["name"])).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    driver: Arc<dyn Driver>,
    in_transaction: Arc<AtomicBool>,
    search: SearchSettings,
}

impl Database {
    /// Opens the SQLite database described by `config`.
    pub async fn open(config: &DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            fts = config.search.fts_enabled,
            "Opening database"
        );
        let driver = SqliteDriver::connect(config).await?;
        Ok(Database::with_driver(Arc::new(driver), config.search.clone()))
    }

    /// Wraps an existing driver.
    pub fn with_driver(driver: Arc<dyn Driver>, search: SearchSettings) -> Self {
        Database {
            driver,
            in_transaction: Arc::new(AtomicBool::new(false)),
            search,
        }
    }

    pub fn search_settings(&self) -> &SearchSettings {
        &self.search
    }

    /// Starts a `SELECT` on `table`.
    pub fn query(&self, table: impl Into<String>) -> QueryBuilder {
        QueryBuilder::new(self.clone(), table)
    }

    // =========================================================================
    // Raw Execution
    // =========================================================================

    pub(crate) async fn execute(
        &self,
        sql: &str,
        params: &[Value],
        mode: ExecMode,
    ) -> DbResult<DriverOutput> {
        self.driver.execute(sql, params, mode).await
    }

    /// Runs `sql` and returns every row (storage-case keys).
    pub async fn fetch_all(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Record>> {
        Ok(self.execute(sql, params, ExecMode::All).await?.into_rows())
    }

    /// Runs `sql` and returns the first row, if any.
    pub async fn fetch_one(&self, sql: &str, params: &[Value]) -> DbResult<Option<Record>> {
        Ok(self.execute(sql, params, ExecMode::Get).await?.into_row())
    }

    /// Runs a statement that returns no rows.
    pub async fn run(&self, sql: &str, params: &[Value]) -> DbResult<RunResult> {
        Ok(self.execute(sql, params, ExecMode::Run).await?.into_run_result())
    }

    /// Runs each statement in order (schema scripts, pragmas).
    pub async fn execute_batch(&self, statements: &[&str]) -> DbResult<()> {
        for statement in statements {
            self.run(statement, &[]).await?;
        }
        Ok(())
    }

    // =========================================================================
    // Row Helpers (storage-case records)
    // =========================================================================

    /// `INSERT INTO table (cols) VALUES (?, ...)`, or `DEFAULT VALUES` for an
    /// empty record.
    pub async fn insert(&self, table: &str, record: &Record) -> DbResult<RunResult> {
        validate_identifier(table)?;

        if record.is_empty() {
            let sql = format!("INSERT INTO {} DEFAULT VALUES", table);
            return self.run(&sql, &[]).await;
        }

        let mut columns = Vec::with_capacity(record.len());
        let mut params = Vec::with_capacity(record.len());
        for (column, value) in record {
            validate_identifier(column)?;
            columns.push(column.as_str());
            params.push(value.clone());
        }

        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders
        );

        debug!(table, columns = columns.len(), "insert");
        self.run(&sql, &params).await
    }

    /// `UPDATE table SET col = ?, ... WHERE id_column = ?`.
    pub async fn update(
        &self,
        table: &str,
        id_column: &str,
        id: Value,
        record: &Record,
    ) -> DbResult<RunResult> {
        validate_identifier(table)?;
        validate_identifier(id_column)?;

        if record.is_empty() {
            return Err(DbError::InvalidInput(format!(
                "update of {} has no columns to set",
                table
            )));
        }

        let mut assignments = Vec::with_capacity(record.len());
        let mut params = Vec::with_capacity(record.len() + 1);
        for (column, value) in record {
            validate_identifier(column)?;
            assignments.push(format!("{} = ?", column));
            params.push(value.clone());
        }
        params.push(id);

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            table,
            assignments.join(", "),
            id_column
        );

        debug!(table, columns = assignments.len(), "update");
        self.run(&sql, &params).await
    }

    /// `DELETE FROM table WHERE id_column = ?`.
    pub async fn delete(&self, table: &str, id_column: &str, id: Value) -> DbResult<RunResult> {
        validate_identifier(table)?;
        validate_identifier(id_column)?;

        let sql = format!("DELETE FROM {} WHERE {} = ?", table, id_column);
        debug!(table, "delete");
        self.run(&sql, &[id]).await
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        self.fetch_one("SELECT 1", &[]).await.is_ok()
    }

    // =========================================================================
    // Transaction Flag
    // =========================================================================

    /// True while a `tx()` unit of work is running on this connection.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::SeqCst)
    }

    pub(crate) fn transaction_flag(&self) -> &Arc<AtomicBool> {
        &self.in_transaction
    }

    // =========================================================================
    // Repositories
    // =========================================================================

    /// Products, with FTS search over name and description when enabled.
    pub fn products(&self) -> Repository<Product> {
        let fts = self.search.fts_enabled.then_some("product_fts");
        Repository::new(
            self.clone(),
            TableMetadata::new("product", "id").with_fts(fts),
        )
    }

    pub fn categories(&self) -> Repository<Category> {
        Repository::new(self.clone(), TableMetadata::new("category", "id"))
    }

    pub fn sales(&self) -> Repository<Sale> {
        Repository::new(self.clone(), TableMetadata::new("sale", "id"))
    }

    pub fn sale_items(&self) -> Repository<SaleItem> {
        Repository::new(self.clone(), TableMetadata::new("sale_item", "id"))
    }
}

//! # Query Builder
//!
//! Assembles one `SELECT` and hands it to a [`QueryExecutor`].
//!
//! ```text
//! db.query("product")
//!   .columns("id, name")                 default "*"
//!   .where_clause("price >= ?", [100])   last call wins
//!   .order_by(&order)                    { categoryId: ascend } → category_id ASC
//!   .limit(20)                           only emitted when > 0
//!   .offset(40)                          only emitted when > 0
//!   .build()?                            SQL text fixed here
//!   .all::<Product>().await?
//! ```
//!
//! `build` consumes the builder, so nothing can change a query after it
//! has been built.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use penny_core::case::{deep_to_app_case, to_storage_case};
use penny_core::filter::OrderBy;
use penny_core::validation::validate_identifier;

use crate::connection::Database;
use crate::driver::{ExecMode, Record};
use crate::error::DbResult;

/// Fluent `SELECT` builder for one table.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    db: Database,
    table: String,
    columns: String,
    where_sql: Option<String>,
    params: Vec<Value>,
    order: Vec<(String, &'static str)>,
    limit: u32,
    offset: u32,
}

impl QueryBuilder {
    pub(crate) fn new(db: Database, table: impl Into<String>) -> Self {
        QueryBuilder {
            db,
            table: table.into(),
            columns: "*".to_string(),
            where_sql: None,
            params: Vec::new(),
            order: Vec::new(),
            limit: 0,
            offset: 0,
        }
    }

    /// Projection, as raw SQL (`"id, name"`, `"COUNT(*) AS total"`).
    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    /// Sets the `WHERE` fragment and its parameters, replacing any earlier one.
    pub fn where_clause(mut self, fragment: impl Into<String>, params: Vec<Value>) -> Self {
        let fragment = fragment.into();
        self.where_sql = if fragment.trim().is_empty() {
            None
        } else {
            Some(fragment)
        };
        self.params = params;
        self
    }

    /// Sets the ordering. Keys are converted to storage case.
    pub fn order_by(mut self, order_by: &OrderBy) -> Self {
        self.order = order_by
            .iter()
            .map(|(key, order)| (to_storage_case(key), order.sql()))
            .collect();
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Freezes the SQL text and parameters.
    ///
    /// ## Errors
    /// `DbError::Validation` when the table or an order key is not a plain
    /// identifier.
    pub fn build(self) -> DbResult<QueryExecutor> {
        validate_identifier(&self.table)?;
        for (column, _) in &self.order {
            validate_identifier(column)?;
        }

        let mut sql = format!("SELECT {} FROM {}", self.columns, self.table);

        if let Some(where_sql) = &self.where_sql {
            sql.push_str(" WHERE ");
            sql.push_str(where_sql);
        }

        if !self.order.is_empty() {
            let clauses: Vec<String> = self
                .order
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&clauses.join(", "));
        }

        if self.limit > 0 {
            sql.push_str(&format!(" LIMIT {}", self.limit));
        }

        if self.offset > 0 {
            // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded
            if self.limit == 0 {
                sql.push_str(" LIMIT -1");
            }
            sql.push_str(&format!(" OFFSET {}", self.offset));
        }

        sql.push(';');

        Ok(QueryExecutor {
            db: self.db,
            sql,
            params: self.params,
        })
    }
}

/// A built query bound to the connection that will run it.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    db: Database,
    sql: String,
    params: Vec<Value>,
}

impl QueryExecutor {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Runs the query and converts every row to `T`.
    pub async fn all<T: DeserializeOwned>(self) -> DbResult<Vec<T>> {
        trace!(sql = %self.sql, "query all");
        let rows = self
            .db
            .execute(&self.sql, &self.params, ExecMode::All)
            .await?
            .into_rows();

        rows.into_iter().map(from_record).collect()
    }

    /// Runs the query and converts the first row to `T`, if there is one.
    pub async fn get<T: DeserializeOwned>(self) -> DbResult<Option<T>> {
        trace!(sql = %self.sql, "query get");
        let row = self
            .db
            .execute(&self.sql, &self.params, ExecMode::Get)
            .await?
            .into_row();

        row.map(from_record).transpose()
    }
}

/// Storage-case record → application-case `T`.
pub(crate) fn from_record<T: DeserializeOwned>(record: Record) -> DbResult<T> {
    let value = deep_to_app_case(Value::Object(record));
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_db;
    use penny_core::filter::SortOrder;
    use serde_json::json;

    #[tokio::test]
    async fn test_build_full_select() {
        let db = memory_db().await;
        let order = OrderBy::new()
            .with("categoryId", SortOrder::Ascend)
            .with("price", SortOrder::Descend);

        let executor = db
            .query("product")
            .columns("id, name")
            .where_clause("price >= ?", vec![json!(100)])
            .order_by(&order)
            .limit(20)
            .offset(40)
            .build()
            .unwrap();

        assert_eq!(
            executor.sql(),
            "SELECT id, name FROM product WHERE price >= ? ORDER BY category_id ASC, price DESC LIMIT 20 OFFSET 40;"
        );
        assert_eq!(executor.params(), &[json!(100)]);
    }

    #[tokio::test]
    async fn test_zero_limit_and_offset_are_omitted() {
        let db = memory_db().await;
        let executor = db.query("product").limit(0).offset(0).build().unwrap();
        assert_eq!(executor.sql(), "SELECT * FROM product;");

        let executor = db.query("product").offset(10).build().unwrap();
        assert_eq!(executor.sql(), "SELECT * FROM product LIMIT -1 OFFSET 10;");
    }

    #[tokio::test]
    async fn test_last_where_wins() {
        let db = memory_db().await;
        let executor = db
            .query("product")
            .where_clause("id = ?", vec![json!(1)])
            .where_clause("name = ?", vec![json!("x")])
            .build()
            .unwrap();

        assert_eq!(executor.sql(), "SELECT * FROM product WHERE name = ?;");
        assert_eq!(executor.params(), &[json!("x")]);
    }

    #[tokio::test]
    async fn test_rejects_unsafe_order_key() {
        let db = memory_db().await;
        let order = OrderBy::new().with("name; DROP TABLE product", SortOrder::Ascend);
        assert!(db.query("product").order_by(&order).build().is_err());
    }

    #[tokio::test]
    async fn test_executor_converts_rows_to_app_case() {
        let db = memory_db().await;
        db.run(
            "INSERT INTO category (name) VALUES (?)",
            &[json!("Drinks")],
        )
        .await
        .unwrap();
        db.run(
            "INSERT INTO product (name, category_id, price, cost) VALUES (?, ?, ?, ?)",
            &[json!("Cola"), json!(1), json!(150), json!(90)],
        )
        .await
        .unwrap();

        let rows: Vec<Value> = db
            .query("product")
            .columns("id, category_id")
            .build()
            .unwrap()
            .all()
            .await
            .unwrap();
        assert_eq!(rows, vec![json!({ "id": 1, "categoryId": 1 })]);

        let missing: Option<Value> = db
            .query("product")
            .where_clause("id = ?", vec![json!(99)])
            .build()
            .unwrap()
            .get()
            .await
            .unwrap();
        assert_eq!(missing, None);
    }
}

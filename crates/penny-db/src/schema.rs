//! # Reference Schema
//!
//! The tables the domain repositories expect. Every statement is
//! `IF NOT EXISTS`, so [`apply`] can run on every start; this is not a
//! migration system and never alters an existing table.
//!
//! ## Tables
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  category ◄── product ◄── sale_item ──► sale                            │
//! │                  │                                                      │
//! │                  └── product_fts (FTS5, external content)               │
//! │                      kept in sync by AFTER INSERT/DELETE/UPDATE         │
//! │                      triggers; rowid = product.id                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::debug;

use crate::connection::Database;
use crate::error::DbResult;

/// Statements creating the reference schema, in dependency order.
pub const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS category (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS product (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        category_id INTEGER REFERENCES category(id),
        price INTEGER NOT NULL DEFAULT 0,
        cost INTEGER NOT NULL DEFAULT 0,
        stock INTEGER,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        deleted_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_product_category ON product(category_id)",
    "CREATE VIRTUAL TABLE IF NOT EXISTS product_fts USING fts5(
        name,
        description,
        content='product',
        content_rowid='id'
    )",
    "CREATE TRIGGER IF NOT EXISTS product_fts_insert AFTER INSERT ON product BEGIN
        INSERT INTO product_fts(rowid, name, description)
        VALUES (new.id, new.name, new.description);
    END",
    "CREATE TRIGGER IF NOT EXISTS product_fts_delete AFTER DELETE ON product BEGIN
        INSERT INTO product_fts(product_fts, rowid, name, description)
        VALUES ('delete', old.id, old.name, old.description);
    END",
    "CREATE TRIGGER IF NOT EXISTS product_fts_update AFTER UPDATE ON product BEGIN
        INSERT INTO product_fts(product_fts, rowid, name, description)
        VALUES ('delete', old.id, old.name, old.description);
        INSERT INTO product_fts(rowid, name, description)
        VALUES (new.id, new.name, new.description);
    END",
    "CREATE TABLE IF NOT EXISTS sale (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_name TEXT,
        payment_amount INTEGER NOT NULL,
        payment_method TEXT NOT NULL,
        sale_date TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        total_amount INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sale_date ON sale(sale_date)",
    "CREATE TABLE IF NOT EXISTS sale_item (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sale_id INTEGER NOT NULL REFERENCES sale(id),
        product_id INTEGER NOT NULL REFERENCES product(id),
        quantity INTEGER NOT NULL,
        price INTEGER NOT NULL,
        cost INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sale_item_sale ON sale_item(sale_id)",
];

/// Creates any missing table, index or trigger.
pub async fn apply(db: &Database) -> DbResult<()> {
    debug!(statements = STATEMENTS.len(), "Applying reference schema");
    db.execute_batch(STATEMENTS).await
}

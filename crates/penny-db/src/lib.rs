//! # penny-db: SQLite Data Layer for Penny POS
//!
//! Everything that touches the database: one long-lived SQLite connection,
//! a small query builder, re-entrant transactions, a generic repository with
//! paged fuzzy search, relation loading, and the checkout service.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Penny POS Data Flow                              │
//! │                                                                         │
//! │  UI (product search, checkout, reports)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     penny-db (THIS CRATE)                       │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌───────────────┐    │    │
//! │  │   │ CheckoutSvc   │──►│ Repository<T>  │──►│ QueryBuilder  │    │    │
//! │  │   │ (checkout.rs) │   │ page, relation │   │ (query.rs)    │    │    │
//! │  │   └───────────────┘   └───────┬────────┘   └───────┬───────┘    │    │
//! │  │                               │ tx()               │            │    │
//! │  │                               ▼                    ▼            │    │
//! │  │   ┌──────────────────────────────────────────────────────┐      │    │
//! │  │   │ Database (connection.rs) ── Arc<dyn Driver>          │      │    │
//! │  │   │   SqliteDriver: one SqliteConnection behind a Mutex  │      │    │
//! │  │   └──────────────────────────────────────────────────────┘      │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (platform data dir)/penny.db                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Database path, pragmas and search settings
//! - [`driver`] - The driver contract and the sqlx SQLite driver
//! - [`connection`] - The shared [`Database`] handle
//! - [`query`] - Query builder / executor
//! - [`transaction`] - `tx()` with join-if-active semantics
//! - [`repository`] - Generic repository, paging, relations, domain queries
//! - [`checkout`] - Atomic checkout
//! - [`schema`] - Reference tables used by the domain repositories
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use penny_db::{schema, Database, DbConfig};
//! use penny_core::PageParams;
//!
//! let db = Database::open(&DbConfig::load(None)?).await?;
//! schema::apply(&db).await?;
//!
//! let params = PageParams::search("cola", &["name", "description"]).limit(20);
//! let page = db.products().search_page(&params).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod query;
pub mod repository;
pub mod schema;
pub mod transaction;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::CheckoutService;
pub use config::{DbConfig, SearchSettings};
pub use connection::Database;
pub use driver::{Driver, DriverOutput, ExecMode, Record, RunResult, SqliteDriver};
pub use error::{DbError, DbResult};
pub use query::{QueryBuilder, QueryExecutor};
pub use repository::{Entity, Repository, TableMetadata};
pub use transaction::with_transaction;

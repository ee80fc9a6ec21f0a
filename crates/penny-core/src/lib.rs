//! # penny-core: Pure Query Logic for Penny POS
//!
//! Everything in this crate is deterministic and free of I/O: it decides
//! *what* SQL to run, never runs it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Penny POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                    UI (product table, checkout)                 │    │
//! │  │          PageParams { filter, orderBy, limit, offset }          │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │               ★ penny-core (THIS CRATE) ★                       │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐    │    │
//! │  │   │   case    │  │  search   │  │  filter   │  │ validation│    │    │
//! │  │   │ camel ⇄   │  │ permuted  │  │ Filter →  │  │ identifiers│   │    │
//! │  │   │  snake    │  │   LIKE    │  │  WHERE    │  │ checkout  │    │    │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘    │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO DATABASE • PURE FUNCTIONS                         │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │                    penny-db (Database Layer)                    │    │
//! │  │        QueryBuilder, transactions, repositories, checkout       │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`case`] - camelCase ⇄ snake_case key conversion, shallow and deep
//! - [`search`] - Word-order independent `LIKE` clauses and FTS5 prefix queries
//! - [`filter`] - `PageParams`, `Filter` and the filter → `WHERE` translator
//! - [`types`] - Domain entities (Product, Category, Sale, SaleItem)
//! - [`error`] - Domain error types
//! - [`validation`] - Identifier and checkout validation
//!
//! ## Example Usage
//!
//! ```rust
//! use penny_core::filter::{FilterTranslator, PageParams};
//!
//! let params = PageParams::search("red shirt", &["name", "description"]);
//! let clause = FilterTranslator::new("id")
//!     .translate(params.filter.as_ref().unwrap())
//!     .unwrap()
//!     .unwrap();
//!
//! // 2 words → 2 orderings, across 2 columns
//! assert_eq!(clause.params.len(), 4);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod case;
pub mod error;
pub mod filter;
pub mod search;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use case::{deep_to_app_case, deep_to_storage_case, to_app_case, to_storage_case};
pub use error::{CoreError, ValidationError};
pub use filter::{
    Filter, FilterCondition, FilterMap, FilterOp, FilterTranslator, OrderBy, Page, PageParams,
    SortOrder, WhereClause,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single checkout.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

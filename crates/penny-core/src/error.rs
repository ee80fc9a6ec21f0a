//! # Error Types
//!
//! Domain-specific error types for penny-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  penny-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule failures (checkout)               │
//! │  └── ValidationError  - Input / identifier validation failures          │
//! │                                                                         │
//! │  penny-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A checkout line references a product id that does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Line or sale total does not fit in an i64 cent amount.
    ///
    /// ## When This Occurs
    /// ```text
    /// price (cents) × quantity  ──► checked_mul ──► None
    ///                                   │
    ///                                   ▼
    ///                    AmountOverflow { product_id }
    /// ```
    #[error("Amount overflow while totalling product {product_id}")]
    AmountOverflow { product_id: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any SQL is built or executed.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. a column name that is not a plain identifier).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Validation Module
//!
//! Input checks that run before anything reaches SQL.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Frontend (Angular)                                            │
//! │  └── Form rules, immediate feedback                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Column identifiers (filter / orderBy / foreign keys)               │
//! │  └── Checkout requests                                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  └── NOT NULL, UNIQUE, FOREIGN KEY constraints                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Column names cannot be bound as parameters, so every caller-supplied
//! identifier is checked here before it is interpolated into SQL text.

use crate::error::ValidationError;
use crate::types::CheckoutRequest;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a column or table identifier.
///
/// ## Rules
/// - Must not be empty
/// - First character is an ASCII letter or `_`
/// - Remaining characters are ASCII letters, digits or `_`
///
/// ## Example
/// ```rust
/// use penny_core::validation::validate_identifier;
///
/// assert!(validate_identifier("category_id").is_ok());
/// assert!(validate_identifier("name; DROP TABLE product").is_err());
/// ```
pub fn validate_identifier(identifier: &str) -> ValidationResult<()> {
    let mut chars = identifier.chars();

    let Some(first) = chars.next() else {
        return Err(ValidationError::Required {
            field: "column".to_string(),
        });
    };

    let valid = (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "column".to_string(),
            reason: format!("'{}' is not a valid identifier", identifier),
        });
    }

    Ok(())
}

// =============================================================================
// Checkout Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates the amount handed over by the customer (cents).
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "payment amount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates the number of lines in one checkout.
pub fn validate_cart_size(lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if lines > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

/// Validates a whole checkout request.
pub fn validate_checkout(request: &CheckoutRequest) -> ValidationResult<()> {
    validate_cart_size(request.items.len())?;
    validate_payment_amount(request.payment_amount)?;

    for line in &request.items {
        validate_quantity(line.quantity)?;
    }

    if let Some(name) = &request.customer_name {
        if name.len() > 200 {
            return Err(ValidationError::TooLong {
                field: "customer name".to_string(),
                max: 200,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CheckoutLine, PaymentMethod};

    fn request(items: Vec<CheckoutLine>) -> CheckoutRequest {
        CheckoutRequest {
            customer_name: Some("Walk-in".to_string()),
            payment_amount: 1000,
            payment_method: PaymentMethod::Cash,
            items,
        }
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("name").is_ok());
        assert!(validate_identifier("_hidden").is_ok());
        assert!(validate_identifier("sale_item_2").is_ok());

        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2fast").is_err());
        assert!(validate_identifier("price DESC").is_err());
        assert!(validate_identifier("a.b").is_err());
        assert!(validate_identifier("x'--").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_checkout() {
        let line = CheckoutLine {
            product_id: 1,
            quantity: 2,
        };
        assert!(validate_checkout(&request(vec![line.clone()])).is_ok());

        assert!(validate_checkout(&request(vec![])).is_err());

        let bad_line = CheckoutLine {
            product_id: 1,
            quantity: 0,
        };
        assert!(validate_checkout(&request(vec![line.clone(), bad_line])).is_err());

        let mut negative = request(vec![line]);
        negative.payment_amount = -5;
        assert!(validate_checkout(&negative).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(1).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS + 1).is_err());
    }
}

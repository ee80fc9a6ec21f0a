//! # Domain Types
//!
//! Entities stored by Penny POS, plus the DTOs handed to the UI.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │    Category     │◄──│    Product      │   │      Sale       │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  id (i64)       │   │  id (i64)       │   │  id (i64)       │        │
//! │  │  name           │   │  category_id    │   │  customer_name  │        │
//! │  └─────────────────┘   │  price / cost   │   │  total_amount   │        │
//! │                        │  stock          │   └────────▲────────┘        │
//! │                        └────────▲────────┘            │ sale_id         │
//! │                                 │ product_id ┌────────┴────────┐        │
//! │                                 └────────────│    SaleItem     │        │
//! │                                              └─────────────────┘        │
//! │                                                                         │
//! │  Field names serialize camelCase; columns are snake_case.              │
//! │  Amounts are integer cents.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// SQLite Timestamps
// =============================================================================

/// Serde helpers for SQLite `CURRENT_TIMESTAMP` text (`2024-01-31 18:05:00`).
pub mod sqlite_datetime {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn format(value: &NaiveDateTime) -> String {
        value.format(FORMAT).to_string()
    }

    pub fn parse(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(text, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
    }

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(de::Error::custom)
    }

    /// Same as the parent module, for nullable columns.
    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => serializer.serialize_str(&super::format(value)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(text) => super::parse(&text).map(Some).map_err(de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

// =============================================================================
// Category
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Insert payload for [`Category`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewCategory {
    pub name: String,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub category_id: Option<i64>,

    /// Price in cents.
    pub price: i64,

    /// Cost in cents (for margin reports).
    pub cost: i64,

    /// Current stock level. `None` means stock is not tracked.
    #[serde(default)]
    pub stock: Option<i64>,

    #[serde(default, with = "sqlite_datetime::option")]
    #[ts(as = "Option<String>")]
    pub created_at: Option<NaiveDateTime>,

    #[serde(default, with = "sqlite_datetime::option")]
    #[ts(as = "Option<String>")]
    pub updated_at: Option<NaiveDateTime>,

    /// Set when the product is retired from the catalog.
    #[serde(default, with = "sqlite_datetime::option")]
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<NaiveDateTime>,
}

/// Insert payload for [`Product`]. Timestamps come from column defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub category_id: Option<i64>,
    pub price: i64,
    pub cost: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub stock: Option<i64>,
}

/// Partial update for [`Product`]; only the fields that are set are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub cost: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub stock: Option<i64>,
}

/// Product with its category attached, as listed by product search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductDto {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: i64,

    #[serde(default)]
    pub customer_name: Option<String>,

    /// Amount handed over by the customer, in cents.
    pub payment_amount: i64,

    pub payment_method: PaymentMethod,

    #[serde(with = "sqlite_datetime")]
    #[ts(as = "String")]
    pub sale_date: NaiveDateTime,

    /// Sum of line totals, in cents.
    pub total_amount: i64,
}

impl Sale {
    /// Change owed to the customer (never negative).
    pub fn change_due(&self) -> i64 {
        (self.payment_amount - self.total_amount).max(0)
    }
}

/// Insert payload for [`Sale`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSale {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub customer_name: Option<String>,
    pub payment_amount: i64,
    pub payment_method: PaymentMethod,
    /// Defaults to the database's CURRENT_TIMESTAMP when unset.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "sqlite_datetime::option"
    )]
    #[ts(as = "Option<String>")]
    pub sale_date: Option<NaiveDateTime>,
    pub total_amount: i64,
}

// =============================================================================
// Sale Item
// =============================================================================

/// One line of a sale. Price and cost are snapshots taken at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub price: i64,
    pub cost: i64,
}

impl SaleItem {
    /// `price × quantity`, saturating instead of wrapping.
    pub fn line_total(&self) -> i64 {
        self.price.saturating_mul(self.quantity)
    }
}

/// Insert payload for [`SaleItem`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSaleItem {
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub price: i64,
    pub cost: i64,
}

/// Sale with its lines attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleDto {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Checkout
// =============================================================================

/// One cart line submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutLine {
    pub product_id: i64,
    pub quantity: i64,
}

/// Everything needed to record a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    pub payment_amount: i64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub items: Vec<CheckoutLine>,
}

// =============================================================================
// Unit Tests
// =============================================================================

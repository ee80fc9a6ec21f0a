//! # Checkout
//!
//! Turns a cart into a recorded sale, atomically.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CheckoutRequest { items: [(product 1, ×2), (product 3, ×1)], ... }     │
//! │       │                                                                 │
//! │       ▼  tx ────────────────────────────────────────────────────────┐   │
//! │  validate_checkout        empty cart, bad quantity, negative amount │   │
//! │       │                                                             │   │
//! │       ▼                                                             │   │
//! │  products.get_bulk_map    one IN query, unknown id → rollback       │   │
//! │       │                                                             │   │
//! │       ▼                                                             │   │
//! │  total = Σ price × qty    checked, overflow → rollback              │   │
//! │       │                                                             │   │
//! │       ▼                                                             │   │
//! │  INSERT sale, INSERT sale_item per line (price/cost snapshot)       │   │
//! │       └─────────────────────────────────────────────────────────────┘   │
//! │       ▼                                                                 │
//! │  SaleDto { sale, items }                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::info;

use penny_core::error::CoreError;
use penny_core::types::{CheckoutRequest, NewSale, NewSaleItem, Product, SaleDto, SaleItem};
use penny_core::validation::validate_checkout;

use crate::connection::Database;
use crate::error::DbResult;

/// Records sales from checkout requests.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    db: Database,
}

impl CheckoutService {
    pub fn new(db: Database) -> Self {
        CheckoutService { db }
    }

    /// Validates `request`, prices it from the catalog and stores the sale
    /// with its items. Nothing is written unless every step succeeds.
    ///
    /// ## Errors
    /// - `DbError::Validation` for an empty cart, bad quantities or amounts
    /// - `CoreError::ProductNotFound` when a line names an unknown product
    /// - `CoreError::AmountOverflow` when a line or the total overflows
    pub async fn checkout(&self, request: &CheckoutRequest) -> DbResult<SaleDto> {
        let db = &self.db;
        db.tx(move || async move {
            validate_checkout(request)?;

            let product_ids: Vec<i64> = request.items.iter().map(|line| line.product_id).collect();
            let products = db.products().get_bulk_map(&product_ids).await?;

            let mut priced: Vec<(&Product, i64)> = Vec::with_capacity(request.items.len());
            let mut total_amount: i64 = 0;
            for line in &request.items {
                let product = products
                    .get(&line.product_id)
                    .ok_or(CoreError::ProductNotFound(line.product_id))?;
                let overflow = || CoreError::AmountOverflow {
                    product_id: line.product_id,
                };
                let line_total = product
                    .price
                    .checked_mul(line.quantity)
                    .ok_or_else(overflow)?;
                total_amount = total_amount.checked_add(line_total).ok_or_else(overflow)?;
                priced.push((product, line.quantity));
            }

            let sale = db
                .sales()
                .create(&NewSale {
                    customer_name: request.customer_name.clone(),
                    payment_amount: request.payment_amount,
                    payment_method: request.payment_method,
                    sale_date: None,
                    total_amount,
                })
                .await?;

            let sale_items = db.sale_items();
            let mut items: Vec<SaleItem> = Vec::with_capacity(priced.len());
            for (product, quantity) in priced {
                let item = sale_items
                    .create(&NewSaleItem {
                        sale_id: sale.id,
                        product_id: product.id,
                        quantity,
                        price: product.price,
                        cost: product.cost,
                    })
                    .await?;
                items.push(item);
            }

            info!(
                sale_id = sale.id,
                lines = items.len(),
                total_amount,
                "Sale recorded"
            );
            Ok(SaleDto { sale, items })
        })
        .await
    }
}

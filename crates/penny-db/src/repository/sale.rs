//! # Sale Repository
//!
//! Reporting queries over completed sales.
//!
//! ## Sale Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sale #42                           sale_date 2024-05-01 10:15:00       │
//! │  ├── SaleItem: Cola    × 2 @ 150  (cost 90)                             │
//! │  ├── SaleItem: Chips   × 1 @ 200  (cost 120)                            │
//! │  └── total_amount 500, payment_amount 1000, change_due 500              │
//! │                                                                         │
//! │  Item price/cost are snapshots; later catalog edits do not move them.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::debug;

use penny_core::types::{sqlite_datetime, Sale, SaleDto, SaleItem};

use super::{Entity, Repository};
use crate::error::DbResult;

impl Entity for Sale {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Entity for SaleItem {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Deserialize)]
struct AmountRow {
    total: i64,
}

impl Repository<Sale> {
    /// Sum of `total_amount` for sales dated within `[start, end]`, 0 if none.
    pub async fn sales_amount(&self, start: NaiveDateTime, end: NaiveDateTime) -> DbResult<i64> {
        let total = self
            .database()
            .query(&self.metadata().table)
            .columns("COALESCE(SUM(total_amount), 0) AS total")
            .where_clause(
                "sale_date BETWEEN ? AND ?",
                vec![
                    sqlite_datetime::format(&start).into(),
                    sqlite_datetime::format(&end).into(),
                ],
            )
            .build()?
            .get::<AmountRow>()
            .await?
            .map(|row| row.total)
            .unwrap_or(0);

        debug!(%start, %end, total, "sales amount");
        Ok(total)
    }

    /// Attaches each sale's items, loaded with one query.
    pub async fn with_items(&self, sales: Vec<Sale>) -> DbResult<Vec<SaleDto>> {
        self.database()
            .sale_items()
            .load_backward_related(
                sales,
                "saleId",
                |item: &SaleItem| item.sale_id,
                |sale, items| SaleDto { sale, items },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::connection::Database;
    use crate::testing::{memory_db, recording_db};
    use chrono::{NaiveDate, NaiveDateTime};
    use penny_core::types::{NewProduct, NewSale, NewSaleItem, PaymentMethod, Sale};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    async fn record_sale(db: &Database, total: i64, date: Option<NaiveDateTime>) -> Sale {
        db.sales()
            .create(&NewSale {
                customer_name: None,
                payment_amount: total,
                payment_method: PaymentMethod::Cash,
                sale_date: date,
                total_amount: total,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sale_date_defaults_to_now() {
        let db = memory_db().await;
        let sale = record_sale(&db, 100, None).await;
        let age = chrono::Utc::now().naive_utc() - sale.sale_date;
        assert!(age.num_minutes().abs() < 5);
        assert_eq!(sale.payment_method, PaymentMethod::Cash);
    }

    #[tokio::test]
    async fn test_sales_amount_in_range() {
        let db = memory_db().await;
        record_sale(&db, 100, Some(at(1, 9))).await;
        record_sale(&db, 250, Some(at(2, 12))).await;
        record_sale(&db, 400, Some(at(3, 18))).await;

        let sales = db.sales();
        assert_eq!(sales.sales_amount(at(1, 0), at(2, 23)).await.unwrap(), 350);
        assert_eq!(sales.sales_amount(at(2, 12), at(2, 12)).await.unwrap(), 250);
        assert_eq!(sales.sales_amount(at(10, 0), at(11, 0)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_with_items_groups_by_sale() {
        let db = memory_db().await;
        let product = db
            .products()
            .create(&NewProduct {
                name: "Cola".to_string(),
                price: 150,
                cost: 90,
                ..Default::default()
            })
            .await
            .unwrap();

        let first = record_sale(&db, 300, None).await;
        let second = record_sale(&db, 0, None).await;
        for quantity in [1, 1] {
            db.sale_items()
                .create(&NewSaleItem {
                    sale_id: first.id,
                    product_id: product.id,
                    quantity,
                    price: 150,
                    cost: 90,
                })
                .await
                .unwrap();
        }

        let dtos = db.sales().with_items(vec![first, second]).await.unwrap();
        assert_eq!(dtos.len(), 2);
        assert_eq!(dtos[0].items.len(), 2);
        assert_eq!(dtos[0].items.iter().map(|i| i.line_total()).sum::<i64>(), 300);
        assert!(dtos[1].items.is_empty());
    }

    #[tokio::test]
    async fn test_with_items_for_no_sales_issues_no_query() {
        let (db, recorder) = recording_db().await;
        let dtos = db.sales().with_items(Vec::new()).await.unwrap();
        assert!(dtos.is_empty());
        assert!(recorder.statements().is_empty());
    }
}

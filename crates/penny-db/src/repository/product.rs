//! # Product Repository
//!
//! Catalog queries on top of the generic repository.
//!
//! ## Product Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Product Search Works                             │
//! │                                                                         │
//! │  Cashier types: "cola diet"                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PageParams::search("cola diet", &["name", "description"])              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  get_page ── LIKE over every word order                                 │
//! │          └── OR id IN (SELECT rowid FROM product_fts MATCH ...)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  categories.load_related(products, |p| p.category_id)   one IN query    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Page<ProductDto> { items: [Diet Cola (Drinks), ...], total }           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::debug;

use penny_core::filter::{OrderBy, Page, PageParams, SortOrder};
use penny_core::types::{Category, Product, ProductDto};

use super::{Entity, Repository};
use crate::error::DbResult;

impl Entity for Product {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Entity for Category {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Repository<Product> {
    /// Paged product search with each product's category attached.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let params = PageParams::search("cola", &["name", "description"]).limit(20);
    /// let page = db.products().search_page(&params).await?;
    /// ```
    pub async fn search_page(&self, params: &PageParams) -> DbResult<Page<ProductDto>> {
        let page = self.get_page(params).await?;
        let total = page.total;

        let items = self
            .database()
            .categories()
            .load_related(
                page.items,
                |product: &Product| product.category_id,
                |product, category| ProductDto { product, category },
            )
            .await?;

        debug!(items = items.len(), total, "product search");
        Ok(Page { items, total })
    }
}

impl Repository<Category> {
    /// Every category, alphabetically.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let order = OrderBy::new().with("name", SortOrder::Ascend);
        self.get_all(Some(&order)).await
    }
}

#[cfg(test)]
mod tests {
    use crate::config::DbConfig;
    use crate::connection::Database;
    use crate::schema;
    use crate::testing::memory_db;
    use penny_core::filter::{FilterCondition, PageParams, SortOrder};
    use penny_core::types::{NewCategory, NewProduct, ProductUpdate};

    async fn catalog() -> Database {
        let db = memory_db().await;
        let drinks = db
            .categories()
            .create(&NewCategory {
                name: "Drinks".to_string(),
            })
            .await
            .unwrap();
        let snacks = db
            .categories()
            .create(&NewCategory {
                name: "Snacks".to_string(),
            })
            .await
            .unwrap();

        let rows = [
            ("Diet Cola", Some("sugar free"), Some(drinks.id), 150),
            ("Cola Classic", None, Some(drinks.id), 140),
            ("Salted Chips", Some("crunchy potato"), Some(snacks.id), 200),
            ("Gift Card", None, None, 1000),
        ];
        for (name, description, category_id, price) in rows {
            db.products()
                .create(&NewProduct {
                    name: name.to_string(),
                    description: description.map(str::to_string),
                    category_id,
                    price,
                    cost: price / 2,
                    stock: Some(10),
                })
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_search_attaches_categories() {
        let db = catalog().await;
        let params = PageParams::search("cola", &["name", "description"])
            .order_by("price", SortOrder::Ascend);

        let page = db.products().search_page(&params).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].product.name, "Cola Classic");
        assert_eq!(page.items[1].product.name, "Diet Cola");
        for item in &page.items {
            assert_eq!(item.category.as_ref().map(|c| c.name.as_str()), Some("Drinks"));
        }
    }

    #[tokio::test]
    async fn test_search_reversed_words_and_description() {
        let db = catalog().await;

        let page = db
            .products()
            .search_page(&PageParams::search("cola diet", &["name", "description"]))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].product.name, "Diet Cola");

        let page = db
            .products()
            .search_page(&PageParams::search("potato", &["name", "description"]))
            .await
            .unwrap();
        assert_eq!(page.items[0].product.name, "Salted Chips");
    }

    #[tokio::test]
    async fn test_uncategorized_product_has_no_category() {
        let db = catalog().await;
        let params = PageParams::new().filter("price", FilterCondition::gte(1000));

        let page = db.products().search_page(&params).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].category, None);
    }

    #[tokio::test]
    async fn test_search_follows_product_updates() {
        let db = catalog().await;
        db.products()
            .update(
                4,
                &ProductUpdate {
                    name: Some("Cola Voucher".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let page = db
            .products()
            .search_page(&PageParams::search("voucher", &["name"]))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].product.id, 4);
    }

    #[tokio::test]
    async fn test_search_without_fts_table() {
        let db = Database::open(&DbConfig::in_memory().fts_enabled(false))
            .await
            .unwrap();
        schema::apply(&db).await.unwrap();
        db.products()
            .create(&NewProduct {
                name: "Green Tea".to_string(),
                price: 90,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(db.products().metadata().fts_table, None);
        let page = db
            .products()
            .search_page(&PageParams::search("tea green", &["name"]))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_categories_listed_by_name() {
        let db = catalog().await;
        db.categories()
            .create(&NewCategory {
                name: "Bakery".to_string(),
            })
            .await
            .unwrap();

        let names: Vec<String> = db
            .categories()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Bakery", "Drinks", "Snacks"]);
    }
}

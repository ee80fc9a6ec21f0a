//! # Paged Search
//!
//! `PageParams` → one `WHERE` clause → an items query and a count query,
//! both run inside one transaction so they see the same rows.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PageParams                                                             │
//! │    │ validate keys                                                      │
//! │    ▼                                                                    │
//! │  FilterTranslator (table id column, FTS table, permutation cap)         │
//! │    │                                                                    │
//! │    ├──► SELECT * ... WHERE <clause> ORDER BY .. LIMIT .. OFFSET ..      │
//! │    └──► SELECT COUNT(*) AS total ... WHERE <clause>                     │
//! │                                                                         │
//! │  Page { items, total }   items.len() <= limit, total ignores paging     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Deserialize;
use tracing::{debug, warn};

use penny_core::filter::{FilterMap, FilterOp, FilterTranslator, Page, PageParams};
use penny_core::search::tokenize;

use super::{Entity, Repository};
use crate::error::DbResult;

#[derive(Debug, Deserialize)]
struct TotalRow {
    total: u64,
}

impl<T: Entity> Repository<T> {
    /// Returns one page of rows matching `params.filter`, plus the total
    /// number of matching rows.
    pub async fn get_page(&self, params: &PageParams) -> DbResult<Page<T>> {
        params.validate()?;

        let search = self.db.search_settings();
        let translator = FilterTranslator::new(&self.meta.id_column)
            .with_fts(self.meta.fts_table.as_deref())
            .max_permuted_tokens(search.max_permuted_tokens);

        let clause = match &params.filter {
            Some(filter) => {
                warn_on_long_phrases(filter, search.max_permuted_tokens);
                translator.translate(filter)?
            }
            None => None,
        };
        let (where_sql, where_params) = clause
            .map(|clause| (clause.sql, clause.params))
            .unwrap_or_default();

        self.db
            .tx(move || async move {
                let mut items_query = self
                    .db
                    .query(&self.meta.table)
                    .where_clause(where_sql.clone(), where_params.clone());
                if let Some(order_by) = &params.order_by {
                    items_query = items_query.order_by(order_by);
                }
                let items: Vec<T> = items_query
                    .limit(params.limit.unwrap_or(0))
                    .offset(params.offset.unwrap_or(0))
                    .build()?
                    .all()
                    .await?;

                let total = self
                    .db
                    .query(&self.meta.table)
                    .columns("COUNT(*) AS total")
                    .where_clause(where_sql, where_params)
                    .build()?
                    .get::<TotalRow>()
                    .await?
                    .map(|row| row.total)
                    .unwrap_or(0);

                debug!(
                    table = %self.meta.table,
                    items = items.len(),
                    total,
                    "page fetched"
                );
                Ok(Page { items, total })
            })
            .await
    }
}

fn warn_on_long_phrases(filter: &FilterMap, max_tokens: usize) {
    for (column, column_filter) in filter.iter() {
        for condition in column_filter.conditions() {
            if condition.op != FilterOp::Like {
                continue;
            }
            if let Some(text) = condition.value.as_str() {
                let tokens = tokenize(text).len();
                if tokens > max_tokens {
                    warn!(
                        column,
                        tokens,
                        max_tokens,
                        "search phrase exceeds permutation cap; matching every word instead"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::tests::item_repo;
    use penny_core::filter::{Filter, FilterCondition, SortOrder};
    use serde_json::json;

    async fn seeded() -> Repository<crate::repository::tests::Item> {
        let repo = item_repo().await;
        for (name, price) in [
            ("red shirt", 100),
            ("shirt red", 200),
            ("blue hat", 300),
            ("Red Scarf", 400),
            ("green shirt", 500),
        ] {
            repo.create(&json!({ "name": name, "unitPrice": price }))
                .await
                .unwrap();
        }
        repo
    }

    fn ids<T: Entity<Id = i64>>(page: &Page<T>) -> Vec<i64> {
        let mut ids: Vec<i64> = page.items.iter().map(|item| item.id()).collect();
        ids.sort_unstable();
        ids
    }

    #[tokio::test]
    async fn test_word_order_independent_search() {
        let repo = seeded().await;
        let params = PageParams::new().filter("name", FilterCondition::like("red shirt"));

        let page = repo.get_page(&params).await.unwrap();
        assert_eq!(ids(&page), vec![1, 2]);
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_no_filter_returns_everything() {
        let repo = seeded().await;
        let page = repo.get_page(&PageParams::new()).await.unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total, 5);
    }

    #[tokio::test]
    async fn test_limit_offset_do_not_change_total() {
        let repo = seeded().await;
        let params = PageParams::new()
            .order_by("unitPrice", SortOrder::Ascend)
            .limit(2)
            .offset(1);

        let page = repo.get_page(&params).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.items[0].unit_price, Some(200));
        assert_eq!(page.items[1].unit_price, Some(300));

        let tail = repo
            .get_page(&PageParams::new().limit(10).offset(4))
            .await
            .unwrap();
        assert_eq!(tail.items.len(), 1);
        assert_eq!(tail.total, 5);
    }

    #[tokio::test]
    async fn test_order_priority_from_json_params() {
        let repo = seeded().await;
        repo.create(&json!({ "name": "alpha", "unitPrice": 500 }))
            .await
            .unwrap();

        let params: PageParams = serde_json::from_value(json!({
            "orderBy": { "unitPrice": "descend", "name": "ascend" },
            "limit": 3
        }))
        .unwrap();

        let page = repo.get_page(&params).await.unwrap();
        let order: Vec<i64> = page.items.iter().map(|item| item.id()).collect();
        assert_eq!(order, vec![6, 5, 4]);
    }

    #[tokio::test]
    async fn test_comparison_operators() {
        let repo = seeded().await;

        let gte = PageParams::new().filter("unitPrice", FilterCondition::gte(300));
        assert_eq!(ids(&repo.get_page(&gte).await.unwrap()), vec![3, 4, 5]);

        let range = PageParams::new().filter(
            "unitPrice",
            Filter::Many(vec![FilterCondition::gt(100), FilterCondition::lte(400)]),
        );
        assert_eq!(ids(&repo.get_page(&range).await.unwrap()), vec![2, 3, 4]);

        let neq = PageParams::new().filter("name", FilterCondition::neq("blue hat"));
        assert_eq!(repo.get_page(&neq).await.unwrap().total, 4);
    }

    #[tokio::test]
    async fn test_like_is_case_insensitive_substring() {
        let repo = seeded().await;
        let params = PageParams::new().filter("name", FilterCondition::like("red"));
        assert_eq!(ids(&repo.get_page(&params).await.unwrap()), vec![1, 2, 4]);
    }

    #[tokio::test]
    async fn test_like_and_comparison_combined() {
        let repo = seeded().await;
        let params = PageParams::new()
            .filter("name", FilterCondition::like("shirt"))
            .filter("unitPrice", FilterCondition::lt(500));

        assert_eq!(ids(&repo.get_page(&params).await.unwrap()), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_empty_like_is_no_constraint() {
        let repo = seeded().await;
        let params = PageParams::new().filter("name", FilterCondition::like(""));
        assert_eq!(repo.get_page(&params).await.unwrap().total, 5);
    }

    #[tokio::test]
    async fn test_long_phrase_falls_back_to_all_words() {
        let repo = seeded().await;
        repo.create(&json!({ "name": "one two three four five six seven" }))
            .await
            .unwrap();

        let params = PageParams::new().filter(
            "name",
            FilterCondition::like("seven six five four three two one"),
        );
        let page = repo.get_page(&params).await.unwrap();
        assert_eq!(ids(&page), vec![6]);
    }

    #[tokio::test]
    async fn test_invalid_filter_key_is_rejected() {
        let repo = seeded().await;
        let params = PageParams::new().filter("name OR 1=1", FilterCondition::eq(1));
        assert!(repo.get_page(&params).await.is_err());
        assert!(!repo.database().in_transaction());
    }
}

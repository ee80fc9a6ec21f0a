//! # Relation Loading
//!
//! Batch-loads related rows with one query instead of one per item.
//!
//! ```text
//! Forward  (many → one)                 Backward (one → many)
//! ─────────────────────                 ──────────────────────
//! products ──category_id──► category    sales ◄──sale_id── sale_item
//!
//! categories.get_related(&products,     sale_items.get_backward_related(
//!     |p| p.category_id)                    &sales, "saleId", |i| i.sale_id)
//!   → HashMap<category id, Category>     → HashMap<sale id, Vec<SaleItem>>
//! ```

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use penny_core::case::to_storage_case;
use penny_core::validation::validate_identifier;

use super::{Entity, Repository};
use crate::error::DbResult;

impl<R: Entity> Repository<R> {
    /// Loads the rows of this repository referenced by `items`.
    ///
    /// `foreign_key` returns the referenced id, or `None` when an item has
    /// no relation. No query is issued when no item has one.
    pub async fn get_related<T, F>(&self, items: &[T], foreign_key: F) -> DbResult<HashMap<R::Id, R>>
    where
        F: Fn(&T) -> Option<R::Id>,
    {
        let ids: Vec<R::Id> = items.iter().filter_map(foreign_key).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.get_bulk_map(&ids).await
    }

    /// [`get_related`](Self::get_related), then `attach` each item to its
    /// related row (`None` when missing).
    pub async fn load_related<T, D, F, A>(
        &self,
        items: Vec<T>,
        foreign_key: F,
        attach: A,
    ) -> DbResult<Vec<D>>
    where
        R: Clone,
        F: Fn(&T) -> Option<R::Id>,
        A: Fn(T, Option<R>) -> D,
    {
        let related = self.get_related(&items, &foreign_key).await?;
        Ok(items
            .into_iter()
            .map(|item| {
                let found = foreign_key(&item).and_then(|id| related.get(&id).cloned());
                attach(item, found)
            })
            .collect())
    }

    /// Loads the rows of this repository that point back at `parents`
    /// through `foreign_key_column` (application case), grouped by parent id.
    ///
    /// Parents without children have no entry.
    pub async fn get_backward_related<P, F>(
        &self,
        parents: &[P],
        foreign_key_column: &str,
        parent_id: F,
    ) -> DbResult<HashMap<P::Id, Vec<R>>>
    where
        P: Entity,
        F: Fn(&R) -> P::Id,
    {
        let column = to_storage_case(foreign_key_column);
        validate_identifier(&column)?;

        let mut seen = HashSet::with_capacity(parents.len());
        let ids: Vec<Value> = parents
            .iter()
            .map(|parent| parent.id())
            .filter(|id| seen.insert(id.clone()))
            .map(Into::into)
            .collect();

        let children = self.fetch_where_in(&column, ids).await?;

        let mut grouped: HashMap<P::Id, Vec<R>> = HashMap::new();
        for child in children {
            grouped.entry(parent_id(&child)).or_default().push(child);
        }
        Ok(grouped)
    }

    /// [`get_backward_related`](Self::get_backward_related), then `attach`
    /// each parent to its children (empty when none).
    pub async fn load_backward_related<P, D, F, A>(
        &self,
        parents: Vec<P>,
        foreign_key_column: &str,
        parent_id: F,
        attach: A,
    ) -> DbResult<Vec<D>>
    where
        P: Entity,
        F: Fn(&R) -> P::Id,
        A: Fn(P, Vec<R>) -> D,
    {
        let mut grouped = self
            .get_backward_related(&parents, foreign_key_column, parent_id)
            .await?;

        Ok(parents
            .into_iter()
            .map(|parent| {
                let children = grouped.remove(&parent.id()).unwrap_or_default();
                attach(parent, children)
            })
            .collect())
    }
}

//! # Repository Module
//!
//! One generic repository serves every table; domain modules only add
//! table-specific queries on top of it.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Generic Repository                                   │
//! │                                                                         │
//! │  Repository<T: Entity>  +  TableMetadata { table, id_column, fts }      │
//! │  ├── create(&data)          INSERT, re-fetch by id          (tx)        │
//! │  ├── update(id, &data)      UPDATE, re-fetch by id          (tx)        │
//! │  ├── delete(id)             fetch, DELETE, return old row   (tx)        │
//! │  ├── get_by_id(id)          Option<T>                                   │
//! │  ├── get_bulk(&ids)         one IN (...) query, ids deduped             │
//! │  ├── get_bulk_map(&ids)     HashMap<Id, T>                              │
//! │  ├── get_all(order)         Vec<T>                                      │
//! │  ├── get_page(&params)      Page<T>                  (page.rs, tx)      │
//! │  └── get_related / load_related / *_backward_*    (relation.rs)         │
//! │       │                                                                 │
//! │       │  payload: T → JSON → deep_to_storage_case → columns             │
//! │       │  rows:    columns → deep_to_app_case → JSON → T                 │
//! │       ▼                                                                 │
//! │  Database (single connection)                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Domain Extensions
//!
//! - [`product`] - Product search page with categories, category list
//! - [`sale`] - Sales totals and sale items

pub mod page;
pub mod product;
pub mod relation;
pub mod sale;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use tracing::debug;

use penny_core::case::deep_to_storage_case;
use penny_core::filter::OrderBy;

use crate::connection::Database;
use crate::driver::Record;
use crate::error::{DbError, DbResult};

/// SQLite's historical bound-parameter limit.
const MAX_BULK_PARAMS: usize = 999;

// =============================================================================
// Entity
// =============================================================================

/// A row type that can be stored by a [`Repository`].
///
/// Serialized field names are the application-case column names.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    type Id: Clone + Eq + Hash + fmt::Debug + Into<Value> + Send + Sync;

    fn id(&self) -> Self::Id;
}

/// Which table a repository reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    pub table: String,
    pub id_column: String,
    pub fts_table: Option<String>,
}

impl TableMetadata {
    pub fn new(table: impl Into<String>, id_column: impl Into<String>) -> Self {
        TableMetadata {
            table: table.into(),
            id_column: id_column.into(),
            fts_table: None,
        }
    }

    /// Sets the FTS5 shadow table consulted by paged search.
    pub fn with_fts<S: Into<String>>(mut self, fts_table: Option<S>) -> Self {
        self.fts_table = fts_table.map(Into::into);
        self
    }
}

// =============================================================================
// Repository
// =============================================================================

/// CRUD and paged search over one table.
pub struct Repository<T> {
    db: Database,
    meta: TableMetadata,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Repository {
            db: self.db.clone(),
            meta: self.meta.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository").field("meta", &self.meta).finish()
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(db: Database, meta: TableMetadata) -> Self {
        Repository {
            db,
            meta,
            _entity: PhantomData,
        }
    }

    pub fn metadata(&self) -> &TableMetadata {
        &self.meta
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Inserts `data` and returns the stored row.
    ///
    /// The id is taken from `data` when it carries one, otherwise from the
    /// driver's last insert id. Column defaults show up in the result.
    pub async fn create<D: Serialize + Sync>(&self, data: &D) -> DbResult<T> {
        self.db
            .tx(move || async move {
                let record = to_record(data)?;
                let done = self.db.insert(&self.meta.table, &record).await?;

                let id = match record.get(&self.meta.id_column) {
                    Some(id) if !id.is_null() => id.clone(),
                    _ => Value::from(done.last_insert_id),
                };
                debug!(table = %self.meta.table, %id, "created");

                self.fetch_by_value(id.clone())
                    .await?
                    .ok_or_else(|| DbError::not_found(&self.meta.table, id.to_string()))
            })
            .await
    }

    /// Writes the fields present in `data` and returns the updated row.
    ///
    /// ## Errors
    /// `DbError::NotFound` when no row has `id`.
    pub async fn update<D: Serialize + Sync>(&self, id: T::Id, data: &D) -> DbResult<T> {
        self.db
            .tx(move || async move {
                let mut record = to_record(data)?;
                record.remove(&self.meta.id_column);
                let id_value: Value = id.clone().into();

                if !record.is_empty() {
                    let done = self
                        .db
                        .update(&self.meta.table, &self.meta.id_column, id_value.clone(), &record)
                        .await?;
                    if done.rows_affected == 0 {
                        return Err(DbError::not_found(&self.meta.table, format!("{:?}", id)));
                    }
                }
                debug!(table = %self.meta.table, ?id, columns = record.len(), "updated");

                self.fetch_by_value(id_value)
                    .await?
                    .ok_or_else(|| DbError::not_found(&self.meta.table, format!("{:?}", id)))
            })
            .await
    }

    /// Deletes the row and returns it as it was, or `None` if there was no
    /// such row (nothing is deleted then).
    pub async fn delete(&self, id: T::Id) -> DbResult<Option<T>> {
        self.db
            .tx(move || async move {
                let existing = self.get_by_id(id.clone()).await?;
                if existing.is_some() {
                    self.db
                        .delete(&self.meta.table, &self.meta.id_column, id.clone().into())
                        .await?;
                }
                debug!(table = %self.meta.table, ?id, found = existing.is_some(), "deleted");
                Ok(existing)
            })
            .await
    }

    pub async fn get_by_id(&self, id: T::Id) -> DbResult<Option<T>> {
        self.fetch_by_value(id.into()).await
    }

    /// Fetches every row whose id is in `ids`, in one query per 999 distinct ids.
    pub async fn get_bulk(&self, ids: &[T::Id]) -> DbResult<Vec<T>> {
        let mut seen = HashSet::with_capacity(ids.len());
        let distinct: Vec<Value> = ids
            .iter()
            .filter(|id| seen.insert(*id))
            .map(|id| id.clone().into())
            .collect();

        self.fetch_where_in(&self.meta.id_column, distinct).await
    }

    /// [`get_bulk`](Self::get_bulk), keyed by [`Entity::id`].
    pub async fn get_bulk_map(&self, ids: &[T::Id]) -> DbResult<HashMap<T::Id, T>> {
        let entities = self.get_bulk(ids).await?;
        Ok(entities
            .into_iter()
            .map(|entity| (entity.id(), entity))
            .collect())
    }

    pub async fn get_all(&self, order_by: Option<&OrderBy>) -> DbResult<Vec<T>> {
        let mut query = self.db.query(&self.meta.table);
        if let Some(order_by) = order_by {
            query = query.order_by(order_by);
        }
        query.build()?.all().await
    }

    async fn fetch_by_value(&self, id: Value) -> DbResult<Option<T>> {
        self.db
            .query(&self.meta.table)
            .where_clause(format!("{} = ?", self.meta.id_column), vec![id])
            .build()?
            .get()
            .await
    }

    /// `SELECT * WHERE column IN (...)`, chunked; no query for no values.
    pub(crate) async fn fetch_where_in(&self, column: &str, values: Vec<Value>) -> DbResult<Vec<T>> {
        let mut rows = Vec::with_capacity(values.len());

        for chunk in values.chunks(MAX_BULK_PARAMS) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let mut found: Vec<T> = self
                .db
                .query(&self.meta.table)
                .where_clause(format!("{} IN ({})", column, placeholders), chunk.to_vec())
                .build()?
                .all()
                .await?;
            rows.append(&mut found);
        }

        debug!(table = %self.meta.table, requested = values.len(), found = rows.len(), "bulk fetch");
        Ok(rows)
    }
}

/// Serializes a payload into a storage-case record.
fn to_record<D: Serialize>(data: &D) -> DbResult<Record> {
    match deep_to_storage_case(serde_json::to_value(data)?) {
        Value::Object(record) => Ok(record),
        other => Err(DbError::InvalidInput(format!(
            "expected an object payload, got {}",
            other
        ))),
    }
}

//! # Filters, Paging and Filter → SQL Translation
//!
//! The UI describes what it wants as a [`PageParams`]; this module turns the
//! filter part into a single `WHERE` fragment with positional parameters.
//!
//! ## Translation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  filter: {                                                              │
//! │    categoryId:  { op: "eq",   value: 3 },                               │
//! │    price:       [{ op: "gte", value: 100 }, { op: "lt", value: 500 }],  │
//! │    name:        { op: "like", value: "red shirt" },                     │
//! │    description: { op: "like", value: "red shirt" }                      │
//! │  }                                                                      │
//! │       │                                                                 │
//! │       ▼  keys → storage case, split LIKE / non-LIKE                     │
//! │                                                                         │
//! │  category_id = ? AND price >= ? AND price < ?                           │
//! │       AND ( (name LIKE ? OR ... OR description LIKE ? ...)              │
//! │             OR id IN (SELECT rowid FROM product_fts                     │
//! │                       WHERE product_fts MATCH ?) )                      │
//! │                                                                         │
//! │  One fuzzy group per distinct LIKE value, across every column that     │
//! │  asked for it. FTS disjuncts come after all LIKE groups.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use ts_rs::TS;

use crate::case::to_storage_case;
use crate::error::ValidationError;
use crate::search::{exhaust_like_capped, fts_prefix_query, DEFAULT_MAX_PERMUTED_TOKENS};
use crate::validation::validate_identifier;

// =============================================================================
// Field Map
// =============================================================================

/// Insertion-ordered `column → V` mapping.
///
/// Serialized as a JSON object. Order matters: it is the ORDER BY order and
/// the order in which parameters are bound. Inserting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMap<V>(Vec<(String, V)>);

impl<V> FieldMap<V> {
    pub fn new() -> Self {
        FieldMap(Vec::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Chainable [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Default for FieldMap<V> {
    fn default() -> Self {
        FieldMap::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for FieldMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for FieldMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for FieldMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for FieldMapVisitor<V> {
            type Value = FieldMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of column names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = FieldMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(FieldMapVisitor(PhantomData))
    }
}

// =============================================================================
// Filter Types
// =============================================================================

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
}

impl FilterOp {
    /// SQL operator token.
    pub const fn sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Neq => "!=",
            FilterOp::Gt => ">",
            FilterOp::Lt => "<",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
            FilterOp::Like => "LIKE",
        }
    }
}

/// `{ op, value }` as sent by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FilterCondition {
    pub op: FilterOp,
    #[ts(type = "unknown")]
    pub value: Value,
}

impl FilterCondition {
    pub fn new(op: FilterOp, value: impl Into<Value>) -> Self {
        FilterCondition {
            op,
            value: value.into(),
        }
    }

    pub fn eq(value: impl Into<Value>) -> Self {
        Self::new(FilterOp::Eq, value)
    }

    pub fn neq(value: impl Into<Value>) -> Self {
        Self::new(FilterOp::Neq, value)
    }

    pub fn gt(value: impl Into<Value>) -> Self {
        Self::new(FilterOp::Gt, value)
    }

    pub fn lt(value: impl Into<Value>) -> Self {
        Self::new(FilterOp::Lt, value)
    }

    pub fn gte(value: impl Into<Value>) -> Self {
        Self::new(FilterOp::Gte, value)
    }

    pub fn lte(value: impl Into<Value>) -> Self {
        Self::new(FilterOp::Lte, value)
    }

    pub fn like(value: impl Into<Value>) -> Self {
        Self::new(FilterOp::Like, value)
    }
}

/// One condition or an ordered list of conditions on the same column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum Filter {
    One(FilterCondition),
    Many(Vec<FilterCondition>),
}

impl Filter {
    pub fn conditions(&self) -> &[FilterCondition] {
        match self {
            Filter::One(condition) => std::slice::from_ref(condition),
            Filter::Many(conditions) => conditions,
        }
    }
}

impl From<FilterCondition> for Filter {
    fn from(condition: FilterCondition) -> Self {
        Filter::One(condition)
    }
}

impl From<Vec<FilterCondition>> for Filter {
    fn from(conditions: Vec<FilterCondition>) -> Self {
        Filter::Many(conditions)
    }
}

/// Sort direction token used by the UI tables.
///
/// Only `"ascend"` sorts ascending; any other token reads as descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SortOrder {
    Ascend,
    Descend,
}

impl SortOrder {
    pub const fn sql(&self) -> &'static str {
        match self {
            SortOrder::Ascend => "ASC",
            SortOrder::Descend => "DESC",
        }
    }
}

impl<'de> Deserialize<'de> for SortOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Ok(if token == "ascend" {
            SortOrder::Ascend
        } else {
            SortOrder::Descend
        })
    }
}

pub type FilterMap = FieldMap<Filter>;
pub type OrderBy = FieldMap<SortOrder>;

// =============================================================================
// Paging
// =============================================================================

/// Paged query parameters. Every field is optional; absent means no
/// constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PageParams {
    #[serde(default)]
    #[ts(type = "Record<string, Filter> | null")]
    pub filter: Option<FilterMap>,

    #[serde(default)]
    #[ts(type = "Record<string, SortOrder> | null")]
    pub order_by: Option<OrderBy>,

    #[serde(default)]
    pub limit: Option<u32>,

    #[serde(default)]
    pub offset: Option<u32>,
}

impl PageParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Free-text search of `text` across `columns`, merged into one fuzzy
    /// group by the translator.
    pub fn search(text: &str, columns: &[&str]) -> Self {
        let mut params = Self::default();
        for column in columns {
            params = params.filter(*column, FilterCondition::like(text));
        }
        params
    }

    pub fn filter(mut self, column: impl Into<String>, filter: impl Into<Filter>) -> Self {
        self.filter
            .get_or_insert_with(FilterMap::new)
            .insert(column, filter.into());
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by
            .get_or_insert_with(OrderBy::new)
            .insert(column, order);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Checks every filter and order key before it reaches SQL text.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(filter) = &self.filter {
            for key in filter.keys() {
                validate_identifier(key)?;
            }
        }
        if let Some(order_by) = &self.order_by {
            for key in order_by.keys() {
                validate_identifier(key)?;
            }
        }
        Ok(())
    }
}

/// A page of results plus the number of rows matching the filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

// =============================================================================
// Translation
// =============================================================================

/// A `WHERE` fragment (without the keyword) and its positional parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Translates a [`FilterMap`] into a [`WhereClause`] for one table.
#[derive(Debug, Clone)]
pub struct FilterTranslator<'a> {
    id_column: &'a str,
    fts_table: Option<&'a str>,
    max_permuted_tokens: usize,
}

impl<'a> FilterTranslator<'a> {
    pub fn new(id_column: &'a str) -> Self {
        FilterTranslator {
            id_column,
            fts_table: None,
            max_permuted_tokens: DEFAULT_MAX_PERMUTED_TOKENS,
        }
    }

    /// Adds an FTS prefix-match disjunct against `fts_table` per LIKE value.
    pub fn with_fts(mut self, fts_table: Option<&'a str>) -> Self {
        self.fts_table = fts_table;
        self
    }

    pub fn max_permuted_tokens(mut self, max: usize) -> Self {
        self.max_permuted_tokens = max;
        self
    }

    /// Returns `None` when the filter constrains nothing.
    pub fn translate(&self, filter: &FilterMap) -> Result<Option<WhereClause>, ValidationError> {
        let mut and_parts: Vec<String> = Vec::new();
        let mut and_params: Vec<Value> = Vec::new();
        // distinct LIKE text → columns that asked for it, in first-seen order
        let mut like_groups: Vec<(String, Vec<String>)> = Vec::new();

        for (key, column_filter) in filter.iter() {
            let column = to_storage_case(key);
            validate_identifier(&column)?;

            for condition in column_filter.conditions() {
                if condition.op == FilterOp::Like {
                    let text = like_text(&condition.value);
                    match like_groups.iter_mut().find(|(value, _)| *value == text) {
                        Some((_, columns)) => {
                            if !columns.contains(&column) {
                                columns.push(column.clone());
                            }
                        }
                        None => like_groups.push((text, vec![column.clone()])),
                    }
                } else {
                    and_parts.push(format!("{} {} ?", column, condition.op.sql()));
                    and_params.push(condition.value.clone());
                }
            }
        }

        let mut or_parts: Vec<String> = Vec::new();
        let mut or_params: Vec<Value> = Vec::new();

        for (text, columns) in &like_groups {
            let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
            let like = exhaust_like_capped(text, &columns, self.max_permuted_tokens);
            if like.is_empty() {
                continue;
            }
            or_parts.push(format!("({})", like.clause));
            or_params.extend(like.params.into_iter().map(Value::String));
        }

        if let Some(fts_table) = self.fts_table {
            for (text, _) in &like_groups {
                if let Some(query) = fts_prefix_query(text) {
                    or_parts.push(format!(
                        "{} IN (SELECT rowid FROM {fts} WHERE {fts} MATCH ?)",
                        self.id_column,
                        fts = fts_table
                    ));
                    or_params.push(Value::String(query));
                }
            }
        }

        if !or_parts.is_empty() {
            and_parts.push(format!("({})", or_parts.join(" OR ")));
            and_params.extend(or_params);
        }

        if and_parts.is_empty() {
            return Ok(None);
        }

        Ok(Some(WhereClause {
            sql: and_parts.join(" AND "),
            params: and_params,
        }))
    }
}

fn like_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_filter_yields_no_clause() {
        let translator = FilterTranslator::new("id");
        assert_eq!(translator.translate(&FilterMap::new()).unwrap(), None);
    }

    #[test]
    fn test_comparison_operators() {
        let filter = FilterMap::new()
            .with("categoryId", FilterCondition::eq(3).into())
            .with(
                "price",
                Filter::Many(vec![FilterCondition::gte(100), FilterCondition::lt(500)]),
            );

        let clause = FilterTranslator::new("id").translate(&filter).unwrap().unwrap();
        assert_eq!(clause.sql, "category_id = ? AND price >= ? AND price < ?");
        assert_eq!(clause.params, vec![json!(3), json!(100), json!(500)]);
    }

    #[test]
    fn test_operator_table() {
        assert_eq!(FilterOp::Eq.sql(), "=");
        assert_eq!(FilterOp::Neq.sql(), "!=");
        assert_eq!(FilterOp::Gt.sql(), ">");
        assert_eq!(FilterOp::Lt.sql(), "<");
        assert_eq!(FilterOp::Gte.sql(), ">=");
        assert_eq!(FilterOp::Lte.sql(), "<=");
        assert_eq!(FilterOp::Like.sql(), "LIKE");
    }

    #[test]
    fn test_same_like_value_merges_columns() {
        let params = PageParams::search("red shirt", &["name", "description"]);
        let clause = FilterTranslator::new("id")
            .translate(params.filter.as_ref().unwrap())
            .unwrap()
            .unwrap();

        assert_eq!(
            clause.sql,
            "((name LIKE ? OR name LIKE ? OR description LIKE ? OR description LIKE ?))"
        );
        assert_eq!(clause.params.len(), 4);
    }

    #[test]
    fn test_like_combined_with_comparisons_and_fts() {
        let filter = FilterMap::new()
            .with("stock", FilterCondition::gt(0).into())
            .with("name", FilterCondition::like("milk").into());

        let clause = FilterTranslator::new("id")
            .with_fts(Some("product_fts"))
            .translate(&filter)
            .unwrap()
            .unwrap();

        assert_eq!(
            clause.sql,
            "stock > ? AND ((name LIKE ?) OR id IN (SELECT rowid FROM product_fts WHERE product_fts MATCH ?))"
        );
        assert_eq!(clause.params, vec![json!(0), json!("%milk%"), json!("\"milk\"*")]);
    }

    #[test]
    fn test_distinct_like_values_are_separate_groups() {
        let filter = FilterMap::new()
            .with("name", FilterCondition::like("tea").into())
            .with("description", FilterCondition::like("green").into());

        let clause = FilterTranslator::new("id").translate(&filter).unwrap().unwrap();
        assert_eq!(clause.sql, "((name LIKE ?) OR (description LIKE ?))");
        assert_eq!(clause.params, vec![json!("%tea%"), json!("%green%")]);
    }

    #[test]
    fn test_empty_like_contributes_nothing() {
        let filter = FilterMap::new().with("name", FilterCondition::like("").into());
        let translator = FilterTranslator::new("id").with_fts(Some("product_fts"));
        assert_eq!(translator.translate(&filter).unwrap(), None);

        let filter = filter.with("stock", FilterCondition::lte(5).into());
        let clause = translator.translate(&filter).unwrap().unwrap();
        assert_eq!(clause.sql, "stock <= ?");
    }

    #[test]
    fn test_rejects_unsafe_column() {
        let filter = FilterMap::new().with("name; DROP TABLE x", FilterCondition::eq(1).into());
        assert!(FilterTranslator::new("id").translate(&filter).is_err());
    }

    #[test]
    fn test_page_params_deserialize_preserves_order() {
        let params: PageParams = serde_json::from_value(json!({
            "filter": {
                "name": { "op": "like", "value": "cola" },
                "price": [{ "op": "gte", "value": 1 }, { "op": "lte", "value": 9 }]
            },
            "orderBy": { "price": "descend", "name": "ascend" },
            "limit": 20
        }))
        .unwrap();

        let order: Vec<_> = params.order_by.as_ref().unwrap().iter().collect();
        assert_eq!(order, vec![("price", &SortOrder::Descend), ("name", &SortOrder::Ascend)]);
        assert_eq!(params.limit, Some(20));
        assert_eq!(params.offset, None);
        assert!(matches!(
            params.filter.as_ref().unwrap().get("price"),
            Some(Filter::Many(conditions)) if conditions.len() == 2
        ));
    }

    #[test]
    fn test_unknown_sort_token_is_descending() {
        let order: SortOrder = serde_json::from_value(json!("ascend")).unwrap();
        assert_eq!(order.sql(), "ASC");
        let order: SortOrder = serde_json::from_value(json!("desc")).unwrap();
        assert_eq!(order.sql(), "DESC");
    }

    #[test]
    fn test_page_params_validate() {
        assert!(PageParams::new().order_by("createdAt", SortOrder::Descend).validate().is_ok());
        assert!(PageParams::new().order_by("1=1--", SortOrder::Ascend).validate().is_err());
    }
}

//! # Identifier Case Conversion
//!
//! Maps field names between the application convention (camelCase, what
//! serde produces for the frontend) and the storage convention (snake_case
//! SQLite columns).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Entity (serde)          Storage (SQLite)                               │
//! │  ─────────────           ────────────────                               │
//! │  categoryId      ──────► category_id        to_storage_case             │
//! │  categoryId      ◄────── category_id        to_app_case                 │
//! │                                                                         │
//! │  Deep variants walk objects and arrays, leaving scalars untouched.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only ASCII uppercase letters are treated as word boundaries, so the
//! round trip `to_app_case(to_storage_case(k)) == k` holds for every
//! camelCase key that does not start with a digit after an underscore.

use serde_json::Value;

/// Converts a camelCase key to snake_case (`categoryId` → `category_id`).
pub fn to_storage_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Converts a snake_case key to camelCase (`category_id` → `categoryId`).
///
/// An underscore followed by a word character is dropped and the character
/// is uppercased; a doubled underscore collapses to nothing. A trailing
/// underscore, or one followed by a non-word character, is kept as is.
pub fn to_app_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '_' {
            out.push(ch);
            continue;
        }

        match chars.peek().copied() {
            Some('_') => {
                chars.next();
            }
            Some(next) if next.is_alphanumeric() => {
                chars.next();
                out.extend(next.to_uppercase());
            }
            _ => out.push('_'),
        }
    }

    out
}

/// Recursively renames every object key to storage case.
pub fn deep_to_storage_case(value: Value) -> Value {
    deep_map_keys(value, &to_storage_case)
}

/// Recursively renames every object key to application case.
pub fn deep_to_app_case(value: Value) -> Value {
    deep_map_keys(value, &to_app_case)
}

fn deep_map_keys(value: Value, rename: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| (rename(&key), deep_map_keys(inner, rename)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|inner| deep_map_keys(inner, rename))
                .collect(),
        ),
        scalar => scalar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_storage_case() {
        assert_eq!(to_storage_case("categoryId"), "category_id");
        assert_eq!(to_storage_case("firstName"), "first_name");
        assert_eq!(to_storage_case("productCategoryId"), "product_category_id");
        assert_eq!(to_storage_case("name"), "name");
    }

    #[test]
    fn test_to_app_case() {
        assert_eq!(to_app_case("category_id"), "categoryId");
        assert_eq!(to_app_case("product_category_id"), "productCategoryId");
        assert_eq!(to_app_case("total"), "total");
        assert_eq!(to_app_case("trailing_"), "trailing_");
        assert_eq!(to_app_case("a__b"), "ab");
    }

    #[test]
    fn test_deep_to_storage_case() {
        let input = json!({
            "categoryId": 1,
            "productName": "Test Product",
            "nestedObject": {
                "innerValue": "test",
                "deepNested": { "anotherValue": 123 }
            },
            "arrayItems": [
                { "itemId": 1, "itemName": "Item 1" },
                { "itemId": 2, "itemName": "Item 2" }
            ]
        });

        let expected = json!({
            "category_id": 1,
            "product_name": "Test Product",
            "nested_object": {
                "inner_value": "test",
                "deep_nested": { "another_value": 123 }
            },
            "array_items": [
                { "item_id": 1, "item_name": "Item 1" },
                { "item_id": 2, "item_name": "Item 2" }
            ]
        });

        assert_eq!(deep_to_storage_case(input), expected);
    }

    #[test]
    fn test_primitives_untouched() {
        assert_eq!(deep_to_storage_case(json!("someValue")), json!("someValue"));
        assert_eq!(deep_to_storage_case(json!(123)), json!(123));
        assert_eq!(deep_to_app_case(Value::Null), Value::Null);
        assert_eq!(deep_to_app_case(json!(true)), json!(true));
    }

    #[test]
    fn test_round_trip() {
        let original = json!({
            "saleId": 7,
            "customerName": "Ana",
            "items": [{ "productId": 3, "unitPriceCents": 250 }],
            "meta": { "createdAt": null }
        });

        let round_trip = deep_to_app_case(deep_to_storage_case(original.clone()));
        assert_eq!(round_trip, original);
    }
}

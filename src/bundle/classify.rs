//! Infer the component category of an arbitrary fragment from its shape.
//!
//! Used only when the target's location does not already name a category
//! (`components/<category>/<name>`). The checks run in a fixed precedence
//! order and the first match wins:
//!
//! | # | category        | signal                                                   |
//! |---|-----------------|----------------------------------------------------------|
//! | 1 | parameters      | `name` or `in`                                           |
//! | 2 | responses       | `content`, `headers` or `links`, and no `required`       |
//! | 3 | examples        | `value` or `externalValue`                               |
//! | 4 | links           | `operationRef` or `operationId`                          |
//! | 5 | callbacks       | a key containing a `{$...}` runtime expression           |
//! | 6 | path items      | an HTTP method key or `parameters`                       |
//! | 7 | request bodies  | `content`                                                |
//! | 8 | headers         | `schema` (`in`/`name` already claimed by parameters)     |
//! | 9 | schemas         | `type`, `properties`, `items`, `allOf`, `anyOf`, `oneOf`, `enum` |
//!
//! `None` means "unknown": the caller must fall back to inlining.

use serde_yaml::{Mapping, Value};

use crate::model::category::Category;

const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const SCHEMA_KEYS: [&str; 7] = [
    "type",
    "properties",
    "items",
    "allOf",
    "anyOf",
    "oneOf",
    "enum",
];

/// Classify `fragment`, or `None` if no rule matches.
#[must_use]
pub fn classify(fragment: &Value) -> Option<Category> {
    let map = match fragment {
        Value::Mapping(map) => map,
        Value::Tagged(tagged) => return classify(&tagged.value),
        _ => return None,
    };
    let has = |key: &str| map.contains_key(key);

    if has("name") || has("in") {
        return Some(Category::Parameters);
    }
    if (has("content") || has("headers") || has("links")) && !has("required") {
        return Some(Category::Responses);
    }
    if has("value") || has("externalValue") {
        return Some(Category::Examples);
    }
    if has("operationRef") || has("operationId") {
        return Some(Category::Links);
    }
    if has_runtime_expression_key(map) {
        return Some(Category::Callbacks);
    }
    if HTTP_METHODS.into_iter().any(|m| has(m)) || has("parameters") {
        return Some(Category::PathItems);
    }
    if has("content") {
        return Some(Category::RequestBodies);
    }
    // `content` alone was claimed by request bodies above.
    if has("schema") {
        return Some(Category::Headers);
    }
    if SCHEMA_KEYS.into_iter().any(|k| has(k)) {
        return Some(Category::Schemas);
    }
    None
}

fn has_runtime_expression_key(map: &Mapping) -> bool {
    map.keys()
        .filter_map(Value::as_str)
        .any(|k| k.contains("{$"))
}

//! Building blocks for request bodies and query strings.
//!
//! Each operation combines these in a fixed order: pick the fields that map
//! directly, rename them, wrap identifier references, flatten scalar lists
//! and finally drop null fields.

use candlepin_http::QueryParams;
use chrono::{Days, Local};
use serde_json::{Map, Value, json};

use crate::error::ClientResult;
use crate::field_map::{map_fields, select_subset, to_wire_case};
use crate::options::OptionSet;

/// `value` → `{field: value}`; null stays null and objects are taken as an
/// already-built reference.
#[must_use]
pub fn reference(value: &Value, field: &str) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Object(_) => value.clone(),
        other => json!({ field: other }),
    }
}

/// A bare value becomes a one-element list; null becomes an empty list.
#[must_use]
pub fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// `["ram", "cores"]` → `[{"name": "ram"}, {"name": "cores"}]`
#[must_use]
pub fn flatten_named(value: &Value, key: &str) -> Value {
    Value::Array(
        as_list(value)
            .into_iter()
            .map(|item| json!({ key: item }))
            .collect(),
    )
}

/// List of `{"id": …}` references.
///
/// Object elements contribute their own `id`, so full product records and
/// bare product ids can be mixed.
#[must_use]
pub fn id_references(value: &Value) -> Value {
    Value::Array(
        as_list(value)
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => json!({ "id": map.get("id").cloned().unwrap_or(Value::Null) }),
                scalar => json!({ "id": scalar }),
            })
            .collect(),
    )
}

/// Attribute maps on the wire: `{"arch": "x86_64"}` →
/// `[{"name": "arch", "value": "x86_64"}]`.
///
/// Lists of `[name, value]` pairs are converted the same way; elements that
/// are already objects are kept.
#[must_use]
pub fn name_value_pairs(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Array(
            map.iter()
                .map(|(name, value)| json!({ "name": name, "value": value }))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| match item.as_array().map(Vec::as_slice) {
                    Some([name, value]) => json!({ "name": name, "value": value }),
                    _ => item.clone(),
                })
                .collect(),
        ),
        _ => Value::Array(Vec::new()),
    }
}

/// Drop every null entry.
pub fn compact(map: &mut Map<String, Value>) {
    map.retain(|_, value| !value.is_null());
}

/// A request body under construction, keyed in the wire convention.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body(Map<String, Value>);

impl Body {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from `subset` of `options`, renamed to the wire convention
    #[must_use]
    pub fn from_options(options: &OptionSet, subset: Option<&[&str]>) -> Self {
        Self(map_fields(options, subset))
    }

    /// Insert under a key that is already in wire convention
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Insert unless `value` is null
    pub fn insert_non_null(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        if !value.is_null() {
            self.0.insert(key.into(), value);
        }
        self
    }

    /// Copy `keys` from `options`, renamed to the wire convention
    pub fn extend_wire(&mut self, options: &OptionSet, keys: &[&str]) -> &mut Self {
        for key in keys {
            if let Some(value) = options.get(key) {
                self.0.insert(to_wire_case(key), value.clone());
            }
        }
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// Drop null fields
    pub fn compact(&mut self) -> &mut Self {
        compact(&mut self.0);
        self
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Query pairs for `keys` of `options`: null values are omitted, lists
/// become repeated pairs in order, scalars render without JSON quoting.
///
/// # Errors
/// `MissingKey` if a key is not present in `options`.
pub fn query_from(options: &OptionSet, keys: &[&str]) -> ClientResult<QueryParams> {
    let subset = select_subset(options, keys)?;
    let mut params = QueryParams::new();
    for (key, value) in subset.iter() {
        push_query_value(&mut params, key, value);
    }
    Ok(params)
}

/// Append `value` under `key`, expanding lists into repeated pairs
pub fn push_query_value(params: &mut QueryParams, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                if let Some(rendered) = render_scalar(item) {
                    params.push(key, rendered);
                }
            }
        }
        other => {
            if let Some(rendered) = render_scalar(other) {
                params.push(key, rendered);
            }
        }
    }
}

/// Text form of a value inside a query string or path
#[must_use]
pub fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        composite => Some(composite.to_string()),
    }
}

/// Today's local date as `YYYY-MM-DD`
#[must_use]
pub fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// The local date `days` from today as `YYYY-MM-DD`
#[must_use]
pub fn days_from_today(days: u64) -> String {
    let today = Local::now().date_naive();
    today
        .checked_add_days(Days::new(days))
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::options;
    use crate::error::ClientError;

    #[test]
    fn test_reference() {
        assert_eq!(reference(&json!("p1"), "id"), json!({"id": "p1"}));
        assert_eq!(reference(&Value::Null, "id"), Value::Null);
        assert_eq!(reference(&json!({"key": "o"}), "id"), json!({"key": "o"}));
    }

    #[test]
    fn test_as_list_normalizes_scalars() {
        assert_eq!(as_list(&json!("p1")), vec![json!("p1")]);
        assert_eq!(as_list(&json!(["a", "b"])).len(), 2);
        assert!(as_list(&Value::Null).is_empty());
    }

    #[test]
    fn test_flatten_capabilities() {
        assert_eq!(
            flatten_named(&json!(["ram", "cores"]), "name"),
            json!([{"name": "ram"}, {"name": "cores"}])
        );
        assert_eq!(flatten_named(&json!("ram"), "name"), json!([{"name": "ram"}]));
    }

    #[test]
    fn test_id_references_mixed_input() {
        assert_eq!(
            id_references(&json!(["p1", {"id": "p2", "name": "Two"}])),
            json!([{"id": "p1"}, {"id": "p2"}])
        );
        assert_eq!(id_references(&json!("p3")), json!([{"id": "p3"}]));
    }

    #[test]
    fn test_name_value_pairs() {
        assert_eq!(
            name_value_pairs(&json!({"arch": "x86_64", "type": "SVC"})),
            json!([{"name": "arch", "value": "x86_64"}, {"name": "type", "value": "SVC"}])
        );
        assert_eq!(
            name_value_pairs(&json!([["sockets", "2"]])),
            json!([{"name": "sockets", "value": "2"}])
        );
        assert_eq!(name_value_pairs(&Value::Null), json!([]));
    }

    #[test]
    fn test_body_builder() {
        let opts = options! { "display_name" => "Admin", "parent_owner" => null, "key" => "admin" };
        let mut body = Body::from_options(&opts, Some(&["key", "display_name", "parent_owner"]));
        body.insert_non_null("ignored", Value::Null).compact();
        assert_eq!(body.into_value(), json!({"key": "admin", "displayName": "Admin"}));
    }

    #[test]
    fn test_query_from_omits_nulls_and_repeats_lists() {
        let opts = options! {
            "owner" => "admin",
            "consumer" => null,
            "pool" => ["p1", "p2"],
            "async" => false,
            "quantity" => 2,
        };
        let query = query_from(&opts, &["owner", "consumer", "pool", "async", "quantity"]).unwrap();
        assert_eq!(
            query.encode().unwrap(),
            "owner=admin&pool=p1&pool=p2&async=false&quantity=2"
        );
    }

    #[test]
    fn test_query_from_requires_keys() {
        let err = query_from(&options! { "owner" => "admin" }, &["owner", "level"]).unwrap_err();
        assert!(matches!(err, ClientError::MissingKey { .. }));
    }

    #[test]
    fn test_date_defaults_are_iso() {
        let date = today();
        assert_eq!(date.len(), 10);
        assert!(chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok());
        assert!(days_from_today(365) > date);
    }
}

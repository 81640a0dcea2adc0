//! Key renaming between the caller convention (`snake_case`) and the wire
//! convention (`camelCase`).

use serde_json::{Map, Value};

use crate::error::{ClientError, ClientResult};
use crate::options::OptionSet;

/// `display_name` → `displayName`.
///
/// The first segment is kept as is; each later segment gets an uppercase
/// first letter and a lowercase remainder. Keys without `_` are returned
/// unchanged.
#[must_use]
pub fn to_wire_case(key: &str) -> String {
    if !key.contains('_') {
        return key.to_owned();
    }

    let mut out = String::with_capacity(key.len());
    for (index, segment) in key.split('_').enumerate() {
        if index == 0 {
            out.push_str(segment);
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.extend(chars.flat_map(char::to_lowercase));
        }
    }
    out
}

/// `displayName` → `display_name`; inverse of [`to_wire_case`] for
/// lowercase snake-case keys.
#[must_use]
pub fn from_wire_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (index, c) in key.chars().enumerate() {
        if c.is_uppercase() {
            if index > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Restrict `options` to `subset` (when given, in that order, skipping
/// absent keys) and rename every key with [`to_wire_case`].
///
/// Values are passed through untouched.
#[must_use]
pub fn map_fields(options: &OptionSet, subset: Option<&[&str]>) -> Map<String, Value> {
    match subset {
        Some(keys) => keys
            .iter()
            .filter_map(|key| options.get(key).map(|v| (to_wire_case(key), v.clone())))
            .collect(),
        None => options
            .iter()
            .map(|(key, v)| (to_wire_case(key), v.clone()))
            .collect(),
    }
}

/// The entries of `options` named by `keys`, in that order.
///
/// # Errors
/// `MissingKey` naming every requested key absent from `options`.
pub fn select_subset(options: &OptionSet, keys: &[&str]) -> ClientResult<OptionSet> {
    let missing: Vec<String> = keys
        .iter()
        .filter(|key| !options.contains_key(key))
        .map(|key| (*key).to_owned())
        .collect();
    if !missing.is_empty() {
        return Err(ClientError::MissingKey { keys: missing });
    }

    Ok(keys
        .iter()
        .map(|key| (*key, options.value(key).clone()))
        .collect())
}

/// Recursively rename every object key with [`from_wire_case`].
#[must_use]
pub fn keys_from_wire(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (from_wire_case(&k), keys_from_wire(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(keys_from_wire).collect()),
        other => other,
    }
}

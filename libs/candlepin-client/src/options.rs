//! Option sets, per-operation defaults and their validation.
//!
//! Every operation declares a [`DefaultSet`] listing the parameters it
//! accepts. Caller-supplied [`OptionSet`]s are merged over it; unknown keys
//! are rejected and required keys are checked before any request is built.

use serde_json::{Map, Value};

use crate::error::{ClientError, ClientResult};

static NULL: Value = Value::Null;

/// Ordered mapping from parameter key to value.
///
/// Keys use the caller convention (`snake_case`). Insertion order is kept
/// and is the order in which fields reach request bodies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionSet(Map<String, Value>);

impl OptionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style [`insert`](Self::insert)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The value under `key`, `Null` when absent
    #[must_use]
    pub fn value(&self, key: &str) -> &Value {
        self.0.get(key).unwrap_or(&NULL)
    }

    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn is_null(&self, key: &str) -> bool {
        self.value(key).is_null()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Render `key` as one URL path segment.
    ///
    /// # Errors
    /// `MissingRequiredParameter` when the value is null or absent,
    /// `Argument` when it is a list or an object.
    pub fn segment(&self, key: &str) -> ClientResult<String> {
        match self.value(key) {
            Value::Null => Err(ClientError::missing_required([key])),
            Value::String(s) => Ok(urlencoding::encode(s).into_owned()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Array(_) | Value::Object(_) => Err(ClientError::Argument(format!(
                "parameter '{key}' cannot be used as a path segment"
            ))),
        }
    }
}

impl From<Map<String, Value>> for OptionSet {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for OptionSet {
    type Error = ClientError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(ClientError::Argument(format!(
                "options must be an object, got {other}"
            ))),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for OptionSet {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Build an [`OptionSet`] from `key => value` pairs.
///
/// Values use `serde_json::json!` syntax; wrap non-literal expressions in
/// parentheses.
///
/// ```
/// use candlepin_client::options;
///
/// let owner = "admin";
/// let opts = options! {
///     "key" => (owner),
///     "display_name" => "Admin Owner",
///     "capabilities" => ["ram", "cores"],
/// };
/// assert_eq!(opts.len(), 3);
/// ```
#[macro_export]
macro_rules! options {
    () => {
        $crate::OptionSet::new()
    };
    ($($key:expr => $value:tt),+ $(,)?) => {{
        let mut set = $crate::OptionSet::new();
        $( set.insert($key, $crate::__private::json!($value)); )+
        set
    }};
}

/// Declared parameters of one operation and their default values.
///
/// Built per call, so computed defaults (today's date, the sticky uuid)
/// are always fresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultSet(Map<String, Value>);

impl DefaultSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter with its default
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, default: impl Into<Value>) -> Self {
        self.0.insert(key.into(), default.into());
        self
    }

    /// Append every parameter of `other`
    #[must_use]
    pub fn extend(mut self, other: DefaultSet) -> Self {
        self.0.extend(other.0);
        self
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// `page`, `per_page`, `order` and `sort_by`, all null
#[must_use]
pub fn page_options() -> DefaultSet {
    DefaultSet::new()
        .param("page", Value::Null)
        .param("per_page", Value::Null)
        .param("order", Value::Null)
        .param("sort_by", Value::Null)
}

/// Merge caller options over an operation's defaults.
///
/// The result holds every default key, in declaration order; supplied
/// values replace defaults wholesale.
///
/// # Errors
/// `UnknownParameter` naming every supplied key that `defaults` lacks, in
/// the order supplied.
pub fn merge(supplied: OptionSet, defaults: &DefaultSet) -> ClientResult<OptionSet> {
    let unknown: Vec<&str> = supplied
        .keys()
        .filter(|key| !defaults.contains_key(key))
        .collect();
    if !unknown.is_empty() {
        return Err(ClientError::unknown(unknown));
    }

    let mut merged = defaults.0.clone();
    for (key, value) in supplied.0 {
        merged.insert(key, value);
    }
    Ok(OptionSet(merged))
}

/// Check that each of `keys` (every key when empty) is non-null.
///
/// # Errors
/// `MissingRequiredParameter` listing all offending keys.
pub fn validate_required(options: &OptionSet, keys: &[&str]) -> ClientResult<()> {
    validate_required_with(options, keys, |value| !value.is_null())
}

/// Check that `predicate` accepts each of `keys` (every key when empty).
///
/// # Errors
/// `MissingRequiredParameter` listing all keys the predicate rejected.
pub fn validate_required_with<F>(options: &OptionSet, keys: &[&str], predicate: F) -> ClientResult<()>
where
    F: Fn(&Value) -> bool,
{
    let invalid: Vec<&str> = if keys.is_empty() {
        options
            .keys()
            .filter(|key| !predicate(options.value(key)))
            .collect()
    } else {
        keys.iter()
            .copied()
            .filter(|key| !predicate(options.value(key)))
            .collect()
    };

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(ClientError::missing_required(invalid))
    }
}

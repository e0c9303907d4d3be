//! Request parameters and their resolution.
//!
//! [`Params`] is the key/value mapping a caller attaches to a
//! [`Request`](crate::Request). An [`Endpoint`](crate::Endpoint) may add its
//! own extra parameters; [`resolve`] merges both sides with a fixed
//! precedence: **extra parameters override caller parameters**, since extras
//! usually carry protocol-required fields (API keys, versions, signatures).
//!
//! Iteration is in key order, so every encoding built from a [`Params`] is
//! deterministic.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use crate::{Error, Result};

// ============================================================================
// Parameter Values
// ============================================================================

/// A single parameter value.
///
/// Values are stringified without any locale dependency: booleans as
/// `true`/`false`, integers in base 10 and floats in their shortest
/// round-trip form. Lists become repeated keys.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// A text value, used verbatim.
    Text(String),
    /// A boolean value.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    UInt(u64),
    /// A floating point number; must be finite to be encoded.
    Float(f64),
    /// A list of scalar values, encoded as repeated keys.
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// Stringify a scalar value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] for non-finite floats and for lists.
    pub fn to_param_string(&self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text.clone()),
            Self::Bool(value) => Ok(value.to_string()),
            Self::Int(value) => Ok(value.to_string()),
            Self::UInt(value) => Ok(value.to_string()),
            Self::Float(value) if value.is_finite() => Ok(value.to_string()),
            Self::Float(value) => Err(Error::encoding(format!(
                "non-finite number {value} cannot be encoded"
            ))),
            Self::List(_) => Err(Error::encoding("nested lists cannot be encoded")),
        }
    }

    /// Stringify this value into one string per occurrence of its key.
    ///
    /// A scalar yields one string; a list yields one string per item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if any item cannot be stringified.
    pub fn to_param_strings(&self) -> Result<Vec<String>> {
        match self {
            Self::List(items) => items.iter().map(Self::to_param_string).collect(),
            scalar => scalar.to_param_string().map(|value| vec![value]),
        }
    }

    fn from_json(key: &str, value: serde_json::Value) -> Result<Option<Self>> {
        use serde_json::Value;

        let scalar = |value: Value| -> Result<Self> {
            match value {
                Value::Bool(value) => Ok(Self::Bool(value)),
                Value::String(text) => Ok(Self::Text(text)),
                Value::Number(number) => {
                    if let Some(value) = number.as_i64() {
                        Ok(Self::Int(value))
                    } else if let Some(value) = number.as_u64() {
                        Ok(Self::UInt(value))
                    } else {
                        number.as_f64().map(Self::Float).ok_or_else(|| {
                            Error::encoding(format!("parameter `{key}` is not a number"))
                        })
                    }
                }
                Value::Null => Err(Error::encoding(format!(
                    "parameter `{key}` contains a null list item"
                ))),
                Value::Array(_) | Value::Object(_) => Err(Error::encoding(format!(
                    "parameter `{key}` is nested too deeply"
                ))),
            }
        };

        match value {
            Value::Null => Ok(None),
            Value::Array(items) => items
                .into_iter()
                .map(scalar)
                .collect::<Result<Vec<_>>>()
                .map(|items| Some(Self::List(items))),
            other => scalar(other).map(Some),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::UInt(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::UInt(value.into())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        Self::UInt(u64::try_from(value).unwrap_or(u64::MAX))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<Self>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Parameter Mapping
// ============================================================================

/// A mapping from parameter names to values.
///
/// # Example
///
/// ```
/// use courier_core::Params;
///
/// let params = Params::new()
///     .with("q", "rust http")
///     .with("page", 2)
///     .with("tags", vec!["a", "b"]);
///
/// assert_eq!(params.len(), 3);
/// assert_eq!(
///     params.to_pairs().expect("pairs"),
///     vec![
///         ("page".to_string(), "2".to_string()),
///         ("q".to_string(), "rust http".to_string()),
///         ("tags".to_string(), "a".to_string()),
///         ("tags".to_string(), "b".to_string()),
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: BTreeMap<String, ParamValue>,
}

impl Params {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build parameters from any serializable map or struct.
    ///
    /// Top-level `null` fields (e.g. `None`) are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if the value is not a map, or a field is a
    /// nested object or a list containing non-scalars.
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|e| Error::encoding(e.to_string()))?;
        let serde_json::Value::Object(fields) = value else {
            return Err(Error::encoding("parameters must serialize to a map"));
        };

        let mut params = Self::new();
        for (key, value) in fields {
            if let Some(value) = ParamValue::from_json(&key, value)? {
                params.entries.insert(key, value);
            }
        }
        Ok(params)
    }

    /// Add a parameter, returning the updated mapping.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a parameter, returning the previous value for that key.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove a parameter.
    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.entries.remove(key)
    }

    /// Get a parameter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    /// Returns `true` if the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over parameters in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, ParamValue> {
        self.entries.iter()
    }

    /// Iterate over parameter names in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Merge `other` into `self`; values from `other` win on collision.
    ///
    /// Returns the keys whose value was replaced.
    pub fn merge(&mut self, other: Self) -> Vec<String> {
        let mut replaced = Vec::new();
        for (key, value) in other.entries {
            if self.entries.contains_key(&key) {
                replaced.push(key.clone());
            }
            self.entries.insert(key, value);
        }
        replaced
    }

    /// Merge two mappings into a new one; values from `other` win on collision.
    #[must_use]
    pub fn merged(mut self, other: Self) -> Self {
        self.merge(other);
        self
    }

    /// Flatten into `(key, value)` string pairs in key order.
    ///
    /// List values produce one pair per item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if a value cannot be stringified.
    pub fn to_pairs(&self) -> Result<Vec<(String, String)>> {
        let mut pairs = Vec::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            let strings = value
                .to_param_strings()
                .map_err(|e| Error::encoding(format!("parameter `{key}`: {e}")))?;
            pairs.extend(strings.into_iter().map(|value| (key.clone(), value)));
        }
        Ok(pairs)
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        params.extend(iter);
        params
    }
}

impl<K, V> Extend<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl IntoIterator for Params {
    type Item = (String, ParamValue);
    type IntoIter = btree_map::IntoIter<String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// The outcome of [`resolve`]: parameters for the body and for the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedParams {
    /// Caller parameters merged with the endpoint's extra parameters.
    pub body: Params,
    /// The endpoint's extra query parameters.
    pub query: Params,
    /// Caller keys whose value was replaced by an extra parameter.
    pub overridden: Vec<String>,
}

/// Merge caller parameters with an endpoint's extra parameters.
///
/// - body = `caller` merged with `extra_body`, extra wins on collision
/// - query = `extra_query` only
///
/// Keys are never dropped: a colliding key keeps the extra value and is
/// listed in [`ResolvedParams::overridden`].
///
/// # Example
///
/// ```
/// use courier_core::{Params, resolve};
///
/// let caller = Params::new().with("q", "rust").with("format", "xml");
/// let extra = Params::new().with("format", "json");
/// let extra_query = Params::new().with("api_key", "secret");
///
/// let resolved = resolve(caller, extra, extra_query);
/// assert_eq!(resolved.body.get("format").map(ToString::to_string).as_deref(), Some("json"));
/// assert!(resolved.body.contains_key("q"));
/// assert!(resolved.query.contains_key("api_key"));
/// assert_eq!(resolved.overridden, vec!["format".to_string()]);
/// ```
#[must_use]
pub fn resolve(caller: Params, extra_body: Params, extra_query: Params) -> ResolvedParams {
    let mut body = caller;
    let overridden = body.merge(extra_body);
    ResolvedParams {
        body,
        query: extra_query,
        overridden,
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn value_stringification() {
        check!(ParamValue::from("bob").to_param_string().ok() == Some("bob".to_string()));
        check!(ParamValue::from(true).to_param_string().ok() == Some("true".to_string()));
        check!(ParamValue::from(-42).to_param_string().ok() == Some("-42".to_string()));
        check!(ParamValue::from(7_u64).to_param_string().ok() == Some("7".to_string()));
        check!(ParamValue::from(1.5).to_param_string().ok() == Some("1.5".to_string()));
        check!(ParamValue::from(0.1).to_param_string().ok() == Some("0.1".to_string()));
    }

    #[test]
    fn non_finite_float_is_an_encoding_error() {
        let_assert!(Err(err) = ParamValue::from(f64::NAN).to_param_string());
        check!(err.is_encoding());

        let params = Params::new().with("ratio", f64::INFINITY);
        let_assert!(Err(err) = params.to_pairs());
        check!(err.is_encoding());
        check!(err.to_string().contains("ratio"));
    }

    #[test]
    fn list_values_repeat_the_key() {
        let params = Params::new().with("tag", vec!["a", "b"]);
        let pairs = params.to_pairs().expect("pairs");
        assert_eq!(
            pairs,
            vec![
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string())
            ]
        );
    }

    #[test]
    fn nested_list_is_an_encoding_error() {
        let params = Params::new().with("matrix", ParamValue::List(vec![vec![1, 2].into()]));
        let_assert!(Err(err) = params.to_pairs());
        check!(err.is_encoding());
    }

    #[test]
    fn iteration_is_key_ordered() {
        let params: Params = [("b", 2), ("a", 1), ("c", 3)].into_iter().collect();
        let keys: Vec<_> = params.keys().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn from_serialize_struct() {
        #[derive(serde::Serialize)]
        struct Search {
            q: String,
            page: Option<u32>,
            limit: Option<u32>,
            tags: Vec<String>,
            exact: bool,
        }

        let params = Params::from_serialize(&Search {
            q: "rust".to_string(),
            page: Some(2),
            limit: None,
            tags: vec!["http".to_string(), "async".to_string()],
            exact: false,
        })
        .expect("params");

        assert_eq!(params.len(), 4);
        assert!(!params.contains_key("limit"));
        assert_eq!(params.get("page"), Some(&ParamValue::Int(2)));
        assert_eq!(params.get("exact"), Some(&ParamValue::Bool(false)));
        assert_eq!(
            params.get("tags"),
            Some(&ParamValue::List(vec!["http".into(), "async".into()]))
        );
    }

    #[test]
    fn from_serialize_rejects_non_maps_and_nesting() {
        let_assert!(Err(err) = Params::from_serialize(&vec![1, 2, 3]));
        check!(err.is_encoding());

        let nested = serde_json::json!({ "user": { "name": "bob" } });
        let_assert!(Err(err) = Params::from_serialize(&nested));
        check!(err.is_encoding());
        check!(err.to_string().contains("user"));

        let null_item = serde_json::json!({ "ids": [1, null] });
        let_assert!(Err(err) = Params::from_serialize(&null_item));
        check!(err.is_encoding());
    }

    #[test]
    fn resolve_extra_overrides_caller() {
        let caller = Params::new().with("name", "bob").with("format", "xml");
        let extra = Params::new().with("format", "json").with("version", 2);

        let resolved = resolve(caller, extra, Params::new());

        assert_eq!(resolved.body.len(), 3);
        assert_eq!(resolved.body.get("format"), Some(&ParamValue::from("json")));
        assert_eq!(resolved.body.get("name"), Some(&ParamValue::from("bob")));
        assert_eq!(resolved.body.get("version"), Some(&ParamValue::from(2)));
        assert_eq!(resolved.overridden, vec!["format".to_string()]);
        assert!(resolved.query.is_empty());
    }

    #[test]
    fn resolve_query_comes_from_extra_query_only() {
        let caller = Params::new().with("q", "rust");
        let extra_query = Params::new().with("api_key", "k");

        let resolved = resolve(caller, Params::new(), extra_query.clone());

        assert_eq!(resolved.query, extra_query);
        assert!(!resolved.query.contains_key("q"));
        assert!(resolved.body.contains_key("q"));
    }

    #[test]
    fn merge_keeps_every_key() {
        let left = Params::new().with("a", 1).with("shared", "left");
        let right = Params::new().with("b", 2).with("shared", "right");

        let merged = left.clone().merged(right.clone());

        for key in left.keys().chain(right.keys()) {
            assert!(merged.contains_key(key), "lost key {key}");
        }
        assert_eq!(merged.get("shared"), Some(&ParamValue::from("right")));
    }

    #[test]
    fn merge_is_associative() {
        let p = Params::new().with("a", 1).with("x", "p").with("y", "p");
        let q = Params::new().with("b", 2).with("x", "q").with("z", "q");
        let r = Params::new().with("c", 3).with("y", "r").with("z", "r");

        let left = p.clone().merged(q.clone()).merged(r.clone());
        let right = p.merged(q.merged(r));

        assert_eq!(left, right);
    }
}

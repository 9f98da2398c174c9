//! Query parameters rendered in a deterministic order.
//!
//! Backends that compute validation tokens (for example `ETag`s) over the
//! request need the same parameters to always produce the same query string,
//! so keys are sorted by byte value before rendering.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::timestamp::Timestamp;

/// A scalar query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    String(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
            Self::UInt(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// Conversion into an optional query value; `None` means "leave the key out".
pub trait QueryParam {
    fn into_query_value(self) -> Option<QueryValue>;
}

macro_rules! query_param_via {
    ($variant:ident as $target:ty: $($ty:ty),+) => {
        $(
            impl QueryParam for $ty {
                fn into_query_value(self) -> Option<QueryValue> {
                    Some(QueryValue::$variant(<$target>::from(self)))
                }
            }
        )+
    };
}

query_param_via!(Int as i64: i8, i16, i32, i64);
query_param_via!(UInt as u64: u8, u16, u32, u64);
query_param_via!(Float as f64: f32, f64);
query_param_via!(Bool as bool: bool);
query_param_via!(String as String: String, &str, &String);

impl QueryParam for usize {
    fn into_query_value(self) -> Option<QueryValue> {
        Some(QueryValue::UInt(self as u64))
    }
}

impl QueryParam for isize {
    fn into_query_value(self) -> Option<QueryValue> {
        Some(QueryValue::Int(self as i64))
    }
}

impl QueryParam for Timestamp {
    fn into_query_value(self) -> Option<QueryValue> {
        Some(QueryValue::String(self.to_iso8601()))
    }
}

impl QueryParam for QueryValue {
    fn into_query_value(self) -> Option<QueryValue> {
        Some(self)
    }
}

impl<T: QueryParam> QueryParam for Option<T> {
    fn into_query_value(self) -> Option<QueryValue> {
        self.and_then(QueryParam::into_query_value)
    }
}

/// An ordered collection of query parameters.
///
/// Insertion order is kept for inspection; [`QueryParameters::sorted`] and
/// [`QueryParameters::to_query_string`] always render by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParameters {
    pairs: Vec<(String, QueryValue)>,
}

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, skipping absent values.
    pub fn with(mut self, key: impl Into<String>, value: impl QueryParam) -> Self {
        self.insert(key, value);
        self
    }

    /// Add a parameter in place, skipping absent values.
    pub fn insert(&mut self, key: impl Into<String>, value: impl QueryParam) {
        if let Some(value) = value.into_query_value() {
            self.pairs.push((key.into(), value));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.pairs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.pairs.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Pairs sorted by key byte order; repeated keys keep insertion order.
    pub fn sorted(&self) -> Vec<(&str, String)> {
        let mut pairs: Vec<(&str, String)> = self
            .pairs
            .iter()
            .map(|(name, value)| (name.as_str(), value.to_string()))
            .collect();
        pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        pairs
    }

    /// Form-encoded `name=value` pairs joined with `&`, sorted by key.
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in self.sorted() {
            serializer.append_pair(name, &value);
        }
        serializer.finish()
    }
}

impl<K: Into<String>, V: QueryParam> FromIterator<(K, V)> for QueryParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Types that render themselves as query parameters.
///
/// Implement this for request parameter structs, leaving out absent fields:
///
/// ```
/// use courier_common_core::query::{QueryParameters, ToQueryParameters};
///
/// struct Search {
///     term: String,
///     page: Option<u32>,
/// }
///
/// impl ToQueryParameters for Search {
///     fn to_query_parameters(&self) -> QueryParameters {
///         QueryParameters::new()
///             .with("term", &self.term)
///             .with("page", self.page)
///     }
/// }
///
/// let search = Search { term: "rust".into(), page: None };
/// assert_eq!(search.to_query_parameters().to_query_string(), "term=rust");
/// ```
pub trait ToQueryParameters {
    fn to_query_parameters(&self) -> QueryParameters;
}

impl ToQueryParameters for () {
    fn to_query_parameters(&self) -> QueryParameters {
        QueryParameters::new()
    }
}

impl ToQueryParameters for QueryParameters {
    fn to_query_parameters(&self) -> QueryParameters {
        self.clone()
    }
}

impl<T: ToQueryParameters> ToQueryParameters for &T {
    fn to_query_parameters(&self) -> QueryParameters {
        (**self).to_query_parameters()
    }
}

impl<T: ToQueryParameters> ToQueryParameters for Option<T> {
    fn to_query_parameters(&self) -> QueryParameters {
        self.as_ref()
            .map(ToQueryParameters::to_query_parameters)
            .unwrap_or_default()
    }
}

impl<K: AsRef<str>, V: QueryParam + Clone> ToQueryParameters for BTreeMap<K, V> {
    fn to_query_parameters(&self) -> QueryParameters {
        self.iter()
            .map(|(key, value)| (key.as_ref().to_string(), value.clone()))
            .collect()
    }
}

impl<K: AsRef<str>, V: QueryParam + Clone, S> ToQueryParameters for HashMap<K, V, S> {
    fn to_query_parameters(&self) -> QueryParameters {
        self.iter()
            .map(|(key, value)| (key.as_ref().to_string(), value.clone()))
            .collect()
    }
}

impl<K: AsRef<str>, V: QueryParam + Clone> ToQueryParameters for Vec<(K, V)> {
    fn to_query_parameters(&self) -> QueryParameters {
        self.iter()
            .map(|(key, value)| (key.as_ref().to_string(), value.clone()))
            .collect()
    }
}

/// Build [`QueryParameters`] inline, skipping `None` values.
///
/// ```
/// use courier_common_core::query_params;
///
/// let limit: Option<u32> = None;
/// let params = query_params! { "q" => "warehouses", "limit" => limit, "active" => true };
/// assert_eq!(params.to_query_string(), "active=true&q=warehouses");
/// ```
#[macro_export]
macro_rules! query_params {
    () => {
        $crate::query::QueryParameters::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::query::QueryParameters::new()
            $(.with($key, $value))+
    };
}

//! Query strings
//!
//! [`Query`] is an ordered list of key/value pairs. A `None` value marks a
//! key that should be left out when serializing, which lets callers pass
//! optional filters without branching.

use std::fmt;

/// Ordered query parameters
///
/// # Examples
///
/// ```
/// use rhtmx_client_router::Query;
///
/// let query = Query::new()
///     .with("q", "rust router")
///     .with("page", 2)
///     .with_opt("sort", None::<&str>);
///
/// assert_eq!(query.to_search_string(), "?q=rust%20router&page=2");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, Option<String>)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, Some(value.to_string()));
        self
    }

    /// Adds an entry whose value may be absent
    pub fn with_opt<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.insert(key, value.map(|v| v.to_string()));
        self
    }

    /// Sets `key`, replacing an existing entry in place
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Parses `?a=1&b=two`, with or without the leading `?`
    ///
    /// `+` decodes to a space. Keys without `=` get an empty value, and
    /// repeated keys keep their last value.
    pub fn parse(search: &str) -> Self {
        search
            .strip_prefix('?')
            .unwrap_or(search)
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_form(key), decode_form(value))
            })
            .collect()
    }

    pub fn to_search_string(&self) -> String {
        build_search_string(self)
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Query::new();
        for (key, value) in iter {
            query.insert(key, Some(value.into()));
        }
        query
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&build_search_string(self))
    }
}

/// Serializes a query to `?k=v&...`, or `""` when nothing is present
///
/// Entries with an absent value are dropped. Keys and values are
/// percent-encoded.
///
/// ```
/// use rhtmx_client_router::{build_search_string, Query};
///
/// assert_eq!(build_search_string(&Query::new()), "");
///
/// let query = Query::new().with("a", 1).with_opt("b", None::<i32>).with("c", "x&y");
/// assert_eq!(build_search_string(&query), "?a=1&c=x%26y");
/// ```
pub fn build_search_string(query: &Query) -> String {
    let encoded: Vec<String> = query
        .pairs
        .iter()
        .filter_map(|(key, value)| {
            value.as_ref().map(|value| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            })
        })
        .collect();

    if encoded.is_empty() {
        String::new()
    } else {
        format!("?{}", encoded.join("&"))
    }
}

/// Shorthand for [`Query::parse`]
pub fn parse_query(search: &str) -> Query {
    Query::parse(search)
}

fn decode_form(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

use std::collections::{btree_map, BTreeMap};
use std::{env, fmt, str::FromStr, time::Duration};

use crate::error::{Error, Result};
use crate::lookup::Lookup;

/// Textual representation of an environment variable's value
///
/// ```rust
/// use env_loadr::Value;
///
/// let port: u16 = Value::from("8080").parse().unwrap();
/// assert_eq!(port, 8080);
/// assert!(Value::from("T").try_bool().unwrap());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Value(String);

impl Value {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Parses the value with `T`'s [`FromStr`] implementation
    pub fn parse<T: FromStr>(&self) -> Result<T, T::Err> {
        self.0.parse()
    }

    /// Parses the value as a bool.
    ///
    /// Accepts 1, t, T, TRUE, true, True, 0, f, F, FALSE, false and False.
    pub fn try_bool(&self) -> Result<bool, ParseBoolError> {
        match self.0.as_str() {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            other => Err(ParseBoolError(other.to_string())),
        }
    }

    /// Parses the value as a human readable duration, e.g. `1m 30s` or `250ms`
    pub fn duration(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(&self.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Value {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Value {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// Returned by [`Value::try_bool`] for text that is not a known bool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseBoolError(String);

impl fmt::Display for ParseBoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid bool `{}`", self.0)
    }
}

impl std::error::Error for ParseBoolError {}

/// Ordered set of environment variable names and their values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Map(BTreeMap<String, Value>);

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Merges plain strings into the map, overwriting existing keys
    pub fn merge<K, V>(&mut self, src: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in src {
            self.0.insert(k.into(), Value::from(v.into()));
        }
    }

    /// Merges another map into this one, overwriting existing keys
    pub fn merge_values(&mut self, src: Map) {
        self.0.extend(src.0);
    }

    /// Sets the OS environment variables that are not set yet
    pub fn load(&self) {
        self.apply(false);
    }

    /// Sets and overwrites the OS environment variables
    pub fn overload(&self) {
        self.apply(true);
    }

    fn apply(&self, overload: bool) {
        for (key, value) in &self.0 {
            if !overload && env::var_os(key).is_some() {
                continue;
            }
            env::set_var(key, value.as_str());
        }
    }
}

impl Lookup for Map {
    fn lookup(&mut self, key: &str) -> Result<Value> {
        self.0.get(key).cloned().ok_or_else(|| Error::not_found(key))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Map {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Map {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        let value = Value::from("8080");
        assert_eq!(value.parse::<u16>().unwrap(), 8080);
        assert!(Value::from("nope").parse::<u16>().is_err());
    }

    #[test]
    fn test_try_bool() {
        for truthy in ["1", "t", "T", "TRUE", "true", "True"] {
            assert!(Value::from(truthy).try_bool().unwrap(), "{}", truthy);
        }
        for falsy in ["0", "f", "F", "FALSE", "false", "False"] {
            assert!(!Value::from(falsy).try_bool().unwrap(), "{}", falsy);
        }
        assert!(Value::from("yes").try_bool().is_err());
    }

    #[test]
    fn test_duration() {
        let value = Value::from("1m 30s");
        assert_eq!(value.duration().unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_map_lookup() {
        let mut map: Map = [("FOO", "bar")].into_iter().collect();

        assert_eq!(map.lookup("FOO").unwrap(), Value::from("bar"));
        assert!(map.lookup("BAR").unwrap_err().is_not_found());
    }

    #[test]
    fn test_map_merge_overwrites() {
        let mut map: Map = [("FOO", "bar"), ("QUX", "xoo")].into_iter().collect();
        map.merge([("FOO", "baz")]);

        let mut other = Map::new();
        other.insert("QUX", "new");
        map.merge_values(other);

        assert_eq!(map.get("FOO"), Some(&Value::from("baz")));
        assert_eq!(map.get("QUX"), Some(&Value::from("new")));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_map_load_keeps_existing() {
        env::set_var("ENV_LOADR_TEST_MAP_LOAD", "existing");

        let map: Map = [
            ("ENV_LOADR_TEST_MAP_LOAD", "new"),
            ("ENV_LOADR_TEST_MAP_LOAD_OTHER", "other"),
        ]
        .into_iter()
        .collect();
        map.load();

        assert_eq!(env::var("ENV_LOADR_TEST_MAP_LOAD").unwrap(), "existing");
        assert_eq!(env::var("ENV_LOADR_TEST_MAP_LOAD_OTHER").unwrap(), "other");

        map.overload();
        assert_eq!(env::var("ENV_LOADR_TEST_MAP_LOAD").unwrap(), "new");
    }
}

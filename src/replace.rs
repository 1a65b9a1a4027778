use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::lookup::Lookup;
use crate::value::{Map, Value};

// $NAME, ${NAME} and ${NAME:-default}; a default ends at the first `}`
static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z0-9_-]+|\{[A-Za-z0-9_-]+(:-[^}]*)?\})")
        .expect("variable pattern is valid")
});

/// Expands variable references in values looked up from a source
///
/// Every resolved value is remembered, so each key is expanded once.
/// References to keys the source does not know are left as is, unless the
/// reference carries a default.
///
/// ```rust
/// use env_loadr::{Lookup, Map, Replacer};
///
/// let src: Map = [("HOST", "localhost"), ("URL", "http://${HOST}:${PORT:-80}")]
///     .into_iter()
///     .collect();
///
/// let mut replacer = Replacer::new(src);
/// assert_eq!(replacer.lookup("URL").unwrap().as_str(), "http://localhost:80");
/// ```
pub struct Replacer<L> {
    src: L,
    result: Map,
    stack: Vec<String>,
}

impl<L: Lookup> Replacer<L> {
    pub fn new(src: L) -> Self {
        Self {
            src,
            result: Map::new(),
            stack: Vec::with_capacity(4),
        }
    }

    /// Expands the references in a value that is not bound to a key
    pub fn replace(&mut self, value: impl Into<Value>) -> Result<Value> {
        self.expand(value.into())
    }

    /// Returns every value resolved so far
    pub fn into_results(self) -> Map {
        self.result
    }

    fn resolve(&mut self, key: &str, value: Value) -> Result<Value> {
        if self.stack.iter().any(|k| k == key) {
            let mut chain = self.stack.clone();
            chain.push(key.to_string());
            debug!(key, chain = ?chain, "circular dependency between variables");
            return Err(Error::CircularDependency {
                key: key.to_string(),
                chain,
            });
        }

        self.stack.push(key.to_string());
        let expanded = self.expand(value);
        self.stack.pop();

        let value = expanded?;
        trace!(key, "resolved variable");
        self.result.insert(key, value.clone());
        Ok(value)
    }

    fn expand(&mut self, value: Value) -> Result<Value> {
        if !value.as_str().contains('$') {
            return Ok(value);
        }

        let text = value.as_str();
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in VARIABLE.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let reference = &caps[1];
            let (name, default) = match reference
                .strip_prefix('{')
                .and_then(|r| r.strip_suffix('}'))
            {
                Some(inner) => match inner.split_once(":-") {
                    Some((name, default)) => (name, Some(default)),
                    None => (inner, None),
                },
                None => (reference, None),
            };

            let replacement = match self.lookup(name) {
                Ok(found) => found.into_string(),
                Err(err) if err.is_not_found() => match default {
                    Some(default) => default.to_string(),
                    None => continue,
                },
                Err(err) => return Err(err),
            };

            out.push_str(&text[last..whole.start()]);
            out.push_str(&replacement);
            last = whole.end();
        }

        out.push_str(&text[last..]);
        Ok(Value::from(out))
    }
}

impl<L: Lookup> Lookup for Replacer<L> {
    fn lookup(&mut self, key: &str) -> Result<Value> {
        if let Some(found) = self.result.get(key) {
            return Ok(found.clone());
        }

        let value = self.src.lookup(key)?;
        self.resolve(key, value)
    }
}

/// Expands every value of `map` using the map itself as source
pub fn replace_all(map: &Map) -> Result<Map> {
    let mut replacer = Replacer::new(map.clone());
    for (key, value) in map {
        if replacer.result.contains_key(key) {
            continue;
        }
        replacer.resolve(key, value.clone())?;
    }
    Ok(replacer.into_results())
}

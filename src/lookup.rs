use std::env;

use crate::error::{Error, Result};
use crate::value::{Map, Value};

/// A source of environment variable values
///
/// A missing key is reported as [`Error::NotFound`], any other error stops
/// whatever is consuming the source.
pub trait Lookup {
    fn lookup(&mut self, key: &str) -> Result<Value>;
}

impl<L: Lookup + ?Sized> Lookup for &mut L {
    fn lookup(&mut self, key: &str) -> Result<Value> {
        (**self).lookup(key)
    }
}

impl<L: Lookup + ?Sized> Lookup for Box<L> {
    fn lookup(&mut self, key: &str) -> Result<Value> {
        (**self).lookup(key)
    }
}

/// Adapts a closure into a [`Lookup`]
pub struct LookupFn<F>(pub F);

impl<F> Lookup for LookupFn<F>
where
    F: FnMut(&str) -> Result<Value>,
{
    fn lookup(&mut self, key: &str) -> Result<Value> {
        (self.0)(key)
    }
}

/// Looks keys up in the OS environment
#[derive(Debug, Clone, Copy, Default)]
pub struct Environ;

impl Lookup for Environ {
    fn lookup(&mut self, key: &str) -> Result<Value> {
        env::var_os(key)
            .and_then(|v| v.into_string().ok())
            .map(Value::from)
            .ok_or_else(|| Error::not_found(key))
    }
}

/// Snapshot of the OS environment; variables that are not valid unicode are skipped
pub fn environ() -> Map {
    env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

/// Ordered list of sources, the first source that knows a key wins
#[derive(Default)]
pub struct Chain {
    sources: Vec<Box<dyn Lookup>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl Lookup + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn push(&mut self, source: impl Lookup + 'static) {
        self.sources.push(Box::new(source));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Lookup for Chain {
    fn lookup(&mut self, key: &str) -> Result<Value> {
        for source in &mut self.sources {
            match source.lookup(key) {
                Err(err) if err.is_not_found() => continue,
                res => return res,
            }
        }
        Err(Error::not_found(key))
    }
}

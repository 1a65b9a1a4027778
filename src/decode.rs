use std::any::{self, Any, TypeId};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::lookup::Lookup;
use crate::record::{type_of, EnvValue, FieldDef};
use crate::registry::Registry;
use crate::replace::Replacer;
use crate::scan::Reader;
use crate::tag::{Tag, TagOptions};
use crate::traverse::{Traverser, Visitor};
use crate::value::Value;

/// Fills the fields of a struct with values from a [`Lookup`]
///
/// Fields without a value fall back to their default, and are left
/// untouched when there is none.
///
/// ```rust
/// use env_loadr::{Decoder, Env, Map};
///
/// #[derive(Env, Default)]
/// pub struct Config {
///     #[env(default = "8080")]
///     pub port: u16,
///     pub host: String,
/// }
///
/// let src: Map = [("HOST", "localhost")].into_iter().collect();
/// let mut config = Config::default();
/// Decoder::new(src).decode(&mut config).unwrap();
///
/// assert_eq!(config.port, 8080);
/// assert_eq!(config.host, "localhost");
/// ```
pub struct Decoder<L> {
    source: L,
    options: TagOptions,
    registry: Arc<Registry>,
    replace_vars: bool,
}

impl<L: Lookup> Decoder<L> {
    pub fn new(source: L) -> Self {
        Self {
            source,
            options: TagOptions::default(),
            registry: Arc::new(Registry::default()),
            replace_vars: false,
        }
    }

    pub fn with_options(mut self, options: TagOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    /// Expand `$VAR` and `${VAR:-default}` references in looked up values
    pub fn replace_vars(mut self, enabled: bool) -> Self {
        self.replace_vars = enabled;
        self
    }

    pub fn options(&self) -> &TagOptions {
        &self.options
    }

    pub fn into_inner(self) -> L {
        self.source
    }

    pub fn decode<T: EnvValue>(&mut self, target: &mut T) -> Result<()> {
        let traverser = Traverser::new(&self.options);
        let type_name = any::type_name::<T>();

        if self.replace_vars {
            let mut visitor = DecodeVisitor {
                source: Replacer::new(&mut self.source),
                registry: &self.registry,
            };
            traverser.start(target.env_mut(), type_name, &mut visitor)
        } else {
            let mut visitor = DecodeVisitor {
                source: &mut self.source,
                registry: &self.registry,
            };
            traverser.start(target.env_mut(), type_name, &mut visitor)
        }
    }
}

/// Looks up values from the source, expanding references when
/// [`replace_vars`](Decoder::replace_vars) is enabled
impl<L: Lookup> Lookup for Decoder<L> {
    fn lookup(&mut self, key: &str) -> Result<Value> {
        if self.replace_vars {
            Replacer::new(&mut self.source).lookup(key)
        } else {
            self.source.lookup(key)
        }
    }
}

struct DecodeVisitor<'r, S> {
    source: S,
    registry: &'r Registry,
}

impl<'a, S: Lookup> Visitor<&'a mut dyn Any> for DecodeVisitor<'_, S> {
    fn is_known(&self, type_id: TypeId) -> bool {
        self.registry.can_unmarshal(type_id)
    }

    fn visit(&mut self, dest: &'a mut dyn Any, field: &FieldDef, tag: &Tag) -> Result<()> {
        let value = match self.source.lookup(&tag.name) {
            Ok(value) => value,
            Err(err) if err.is_not_found() => {
                if tag.default.is_empty() {
                    debug!(key = %tag.name, "no value found");
                    return Ok(());
                }
                debug!(key = %tag.name, default = %tag.default, "using default value");
                Value::from(tag.default.as_str())
            }
            Err(err) => return Err(err),
        };

        let Some(unmarshal) = self.registry.unmarshaler(type_of(dest)) else {
            return Err(Error::UnsupportedType {
                key: tag.name.clone(),
                type_name: field.ty,
            });
        };

        unmarshal(&value, dest).map_err(|source| Error::Unmarshal {
            key: tag.name.clone(),
            value: value.into_string(),
            source,
        })
    }
}

/// Decodes env formatted text into `target`
pub fn unmarshal<T: EnvValue>(text: &str, target: &mut T) -> Result<()> {
    Decoder::new(Reader::from_text(text)).decode(target)
}

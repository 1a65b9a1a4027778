use std::any::{self, Any, TypeId};
use std::io;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::record::{type_of, EnvValue, FieldDef};
use crate::registry::Registry;
use crate::tag::{Tag, TagOptions};
use crate::traverse::{Traverser, Visitor};
use crate::value::Map;

/// Writes the fields of a struct as env formatted lines
///
/// By default only the names and default values are written, which makes
/// for a template `.env` file. Enable [`take_values`](Self::take_values) to
/// write the fields' current values instead.
pub struct Encoder<W> {
    writer: W,
    options: TagOptions,
    registry: Arc<Registry>,
    take_values: bool,
    export_prefix: bool,
    quote_values: bool,
}

impl<W: io::Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            options: TagOptions::default(),
            registry: Arc::new(Registry::default()),
            take_values: false,
            export_prefix: false,
            quote_values: true,
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

    /// Write the current field values, falling back to the default for
    /// zero or empty values
    pub fn take_values(mut self, enabled: bool) -> Self {
        self.take_values = enabled;
        self
    }

    /// Prefix every line with `export `
    pub fn export_prefix(mut self, enabled: bool) -> Self {
        self.export_prefix = enabled;
        self
    }

    /// Quote values that would not survive being read back otherwise.
    /// Enabled by default.
    pub fn quote_values(mut self, enabled: bool) -> Self {
        self.quote_values = enabled;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn encode<T: EnvValue>(&mut self, value: &T) -> Result<()> {
        let traverser = Traverser::new(&self.options);
        let mut visitor = EncodeVisitor {
            lines: LineWriter {
                writer: &mut self.writer,
                export_prefix: self.export_prefix,
                quote_values: self.quote_values,
            },
            registry: &self.registry,
            take_values: self.take_values,
        };
        traverser.start(value.env_ref(), any::type_name::<T>(), &mut visitor)
    }

    pub fn encode_map(&mut self, map: &Map) -> Result<()> {
        let mut lines = LineWriter {
            writer: &mut self.writer,
            export_prefix: self.export_prefix,
            quote_values: self.quote_values,
        };
        for (key, value) in map {
            lines.write(key, value.as_str())?;
        }
        Ok(())
    }
}

struct LineWriter<'w, W> {
    writer: &'w mut W,
    export_prefix: bool,
    quote_values: bool,
}

impl<W: io::Write> LineWriter<'_, W> {
    fn write(&mut self, name: &str, value: &str) -> Result<()> {
        if self.export_prefix {
            self.writer.write_all(b"export ")?;
        }
        let line = if self.quote_values {
            format_line(name, value)
        } else {
            format!("{}={}", name, value)
        };
        writeln!(self.writer, "{}", line)?;
        Ok(())
    }
}

struct EncodeVisitor<'w, 'r, W> {
    lines: LineWriter<'w, W>,
    registry: &'r Registry,
    take_values: bool,
}

impl<'a, W: io::Write> Visitor<&'a dyn Any> for EncodeVisitor<'_, '_, W> {
    fn is_known(&self, type_id: TypeId) -> bool {
        self.registry.can_marshal(type_id)
    }

    fn visit(&mut self, src: &'a dyn Any, field: &FieldDef, tag: &Tag) -> Result<()> {
        let value = if self.take_values {
            marshal_field(self.registry, src, field, tag)?
        } else {
            tag.default.clone()
        };
        self.lines.write(&tag.name, &value)
    }
}

// Falls back to the tag's default when the field holds its zero value or
// marshals to an empty value
fn marshal_field(registry: &Registry, src: &dyn Any, field: &FieldDef, tag: &Tag) -> Result<String> {
    let Some(marshal) = registry.marshaler(type_of(src)) else {
        return Err(Error::UnsupportedType {
            key: tag.name.clone(),
            type_name: field.ty,
        });
    };
    if registry.is_zero(src) {
        return Ok(tag.default.clone());
    }

    let value = marshal(src).map_err(|source| Error::Marshal {
        key: tag.name.clone(),
        source,
    })?;
    if value.is_empty() {
        Ok(tag.default.clone())
    } else {
        Ok(value)
    }
}

/// Formats a `NAME=value` line, quoting the value when needed
///
/// ```rust
/// use env_loadr::format_line;
///
/// assert_eq!(format_line("FOO", "bar"), "FOO=bar");
/// assert_eq!(format_line("FOO", r#"say "hi""#), r#"FOO='say "hi"'"#);
/// ```
pub fn format_line(name: &str, value: &str) -> String {
    format!("{}={}", name, quote(value))
}

/// Quotes a value so it reads back unchanged.
///
/// Values containing quotes, a `#`, line breaks or surrounding whitespace
/// are quoted. Double quotes are preferred, single quotes are used when the
/// value holds a double quote but no single quote or line break. Line breaks
/// are written as `\n` and `\r` inside double quotes.
pub fn quote(value: &str) -> String {
    let has_double = value.contains('"');
    let has_single = value.contains('\'');
    let has_newline = value.contains(['\n', '\r']);
    let needs_quotes = has_double
        || has_single
        || has_newline
        || value.contains('#')
        || value.trim() != value;

    if !needs_quotes {
        return value.to_string();
    }

    let (mark, escape_mark) = if has_double && !has_single && !has_newline {
        ('\'', false)
    } else {
        ('"', has_double)
    };

    let mut out = String::with_capacity(value.len() + 2);
    out.push(mark);
    for c in value.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c == '\\' || (escape_mark && c == mark) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(mark);
    out
}

/// Collects the current values of a struct's fields into a [`Map`]
#[derive(Debug, Default)]
pub struct Extractor {
    options: TagOptions,
    registry: Arc<Registry>,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: TagOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn extract<T: EnvValue>(&self, value: &T) -> Result<Map> {
        let mut visitor = ExtractVisitor {
            registry: &self.registry,
            map: Map::new(),
        };
        Traverser::new(&self.options).start(value.env_ref(), any::type_name::<T>(), &mut visitor)?;
        Ok(visitor.map)
    }
}

struct ExtractVisitor<'r> {
    registry: &'r Registry,
    map: Map,
}

impl<'a> Visitor<&'a dyn Any> for ExtractVisitor<'_> {
    fn is_known(&self, type_id: TypeId) -> bool {
        self.registry.can_marshal(type_id)
    }

    fn visit(&mut self, src: &'a dyn Any, field: &FieldDef, tag: &Tag) -> Result<()> {
        let value = marshal_field(self.registry, src, field, tag)?;
        self.map.insert(tag.name.clone(), value);
        Ok(())
    }
}

/// Encodes the current values of `value` as env formatted text
pub fn marshal<T: EnvValue>(value: &T) -> Result<String> {
    let mut encoder = Encoder::new(Vec::new()).take_values(true);
    encoder.encode(value)?;
    Ok(String::from_utf8_lossy(&encoder.into_inner()).into_owned())
}

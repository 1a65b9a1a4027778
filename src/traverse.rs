use std::any::{Any, TypeId};

use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::record::{type_of, Field, FieldDef, ValueMut, ValueRef};
use crate::tag::{PrefixMode, Tag, TagOptions};

/// What a value looks like to the [`Traverser`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Record(TypeId),
    Leaf,
    Unsupported,
}

/// A shared or mutable view on a value that can be walked
pub trait Walk: Sized {
    type Leaf;

    fn kind(&self) -> Kind;

    fn into_fields(self) -> Vec<Field<Self>>;

    /// Records are returned as a whole, unsupported values as `None`
    fn into_leaf(self) -> Option<Self::Leaf>;
}

impl<'a> Walk for ValueRef<'a> {
    type Leaf = &'a dyn Any;

    fn kind(&self) -> Kind {
        match self {
            ValueRef::Record(r) => Kind::Record(type_of(r.as_any())),
            ValueRef::Leaf(_) => Kind::Leaf,
            ValueRef::Unsupported => Kind::Unsupported,
        }
    }

    fn into_fields(self) -> Vec<Field<Self>> {
        match self {
            ValueRef::Record(r) => r.fields(),
            _ => Vec::new(),
        }
    }

    fn into_leaf(self) -> Option<<Self as Walk>::Leaf> {
        match self {
            ValueRef::Record(r) => Some(r.as_any()),
            ValueRef::Leaf(v) => Some(v),
            ValueRef::Unsupported => None,
        }
    }
}

impl<'a> Walk for ValueMut<'a> {
    type Leaf = &'a mut dyn Any;

    fn kind(&self) -> Kind {
        match self {
            ValueMut::Record(r) => Kind::Record(type_of(r.as_any())),
            ValueMut::Leaf(_) => Kind::Leaf,
            ValueMut::Unsupported => Kind::Unsupported,
        }
    }

    fn into_fields(self) -> Vec<Field<Self>> {
        match self {
            ValueMut::Record(r) => r.fields_mut(),
            _ => Vec::new(),
        }
    }

    fn into_leaf(self) -> Option<<Self as Walk>::Leaf> {
        match self {
            ValueMut::Record(r) => Some(r.as_any_mut()),
            ValueMut::Leaf(v) => Some(v),
            ValueMut::Unsupported => None,
        }
    }
}

/// Receives every leaf field found by a [`Traverser`]
pub trait Visitor<L> {
    /// Reports whether values of the type are handled as a whole, records of
    /// a known type are not traversed
    fn is_known(&self, type_id: TypeId) -> bool;

    /// Called with the field's value and its fully prefixed tag
    fn visit(&mut self, value: L, field: &FieldDef, tag: &Tag) -> Result<()>;
}

/// Walks the fields of a record, resolving their tags and the prefixes of
/// nested records
///
/// Fields are visited in declaration order and the first error stops the
/// walk. Nested records are prefixed with their own name unless tagged
/// `inline`, in which case their fields share the parent's prefix, or
/// `noprefix`, in which case the record's name replaces the prefix.
#[derive(Debug, Clone, Copy)]
pub struct Traverser<'o> {
    options: &'o TagOptions,
}

impl<'o> Traverser<'o> {
    pub fn new(options: &'o TagOptions) -> Self {
        Self { options }
    }

    /// Walks `root`, which must be a record
    pub fn start<W, V>(&self, root: W, type_name: &'static str, visitor: &mut V) -> Result<()>
    where
        W: Walk,
        V: Visitor<W::Leaf> + ?Sized,
    {
        match root.kind() {
            Kind::Record(_) => self.traverse(root.into_fields(), "", false, visitor),
            _ => Err(Error::StructExpected { type_name }),
        }
    }

    fn traverse<W, V>(
        &self,
        fields: Vec<Field<W>>,
        prefix: &str,
        include: bool,
        visitor: &mut V,
    ) -> Result<()>
    where
        W: Walk,
        V: Visitor<W::Leaf> + ?Sized,
    {
        let strict = self.options.strict_tags && !include;

        for Field { def, value } in fields {
            let kind = value.kind();
            if kind == Kind::Unsupported {
                trace!(field = def.name, "skipping unsupported field");
                continue;
            }

            let mut tag = match self.options.resolve_field(def, strict) {
                Ok(tag) => tag,
                Err(err) if self.options.fail_on_unsupported => return Err(err.into()),
                Err(err) => {
                    warn!(field = def.name, "{}", err);
                    err.tag
                }
            };
            if tag.should_ignore() {
                trace!(field = def.name, "skipping ignored field");
                continue;
            }

            match kind {
                Kind::Record(type_id) if !visitor.is_known(type_id) => {
                    let child = if tag.no_prefix {
                        tag.name
                    } else if tag.inline {
                        prefix.to_string()
                    } else {
                        match self.options.prefix_mode {
                            PrefixMode::Cumulative => join(prefix, &tag.name),
                            PrefixMode::Immediate => tag.name,
                        }
                    };
                    trace!(field = def.name, prefix = %child, "entering nested struct");
                    self.traverse(value.into_fields(), &child, include || tag.include, visitor)?;
                }
                _ => {
                    if !tag.no_prefix {
                        tag.name = join(prefix, &tag.name);
                    }
                    if let Some(leaf) = value.into_leaf() {
                        trace!(field = def.name, key = %tag.name, "visiting field");
                        visitor.visit(leaf, def, &tag)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", prefix, name)
    }
}

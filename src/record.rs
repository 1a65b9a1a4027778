use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use crate::value::Value;

/// Static description of a struct field, generated by `#[derive(Env)]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    /// Type as written in the struct definition
    pub ty: &'static str,
    /// Whether the field is visible outside its module
    pub exported: bool,
    /// Key/value pairs from the `#[env(...)]` attribute, the bare string is
    /// stored under `env`
    pub tags: &'static [(&'static str, &'static str)],
    /// Doc comment of the field
    pub docs: &'static str,
}

impl FieldDef {
    pub fn tag(&self, key: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }
}

/// A field of a record together with a view on its value
pub struct Field<V> {
    pub def: &'static FieldDef,
    pub value: V,
}

impl<V> Field<V> {
    pub fn new(def: &'static FieldDef, value: V) -> Self {
        Self { def, value }
    }
}

/// Shared view on a value
pub enum ValueRef<'a> {
    Record(&'a dyn Record),
    Leaf(&'a dyn Any),
    /// Values that can never hold configuration, like channels
    Unsupported,
}

/// Mutable view on a value
pub enum ValueMut<'a> {
    Record(&'a mut dyn Record),
    Leaf(&'a mut dyn Any),
    Unsupported,
}

/// A struct whose fields can be walked. Implemented by `#[derive(Env)]`.
pub trait Record: Any {
    fn type_name(&self) -> &'static str;

    fn field_defs(&self) -> &'static [FieldDef];

    fn fields(&self) -> Vec<Field<ValueRef<'_>>>;

    fn fields_mut(&mut self) -> Vec<Field<ValueMut<'_>>>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Anything that can appear as a field of a [`Record`]
///
/// Scalars are leaves and are converted with a
/// [`Registry`](crate::Registry). Use [`leaf_type!`](crate::leaf_type) to
/// make your own types usable as fields.
pub trait EnvValue: Any {
    fn env_ref(&self) -> ValueRef<'_>;

    fn env_mut(&mut self) -> ValueMut<'_>;
}

pub(crate) fn type_of(value: &dyn Any) -> TypeId {
    value.type_id()
}

crate::leaf_type!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, PathBuf, Duration, IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4,
    SocketAddrV6, Value,
);

impl<T: 'static> EnvValue for Option<T> {
    fn env_ref(&self) -> ValueRef<'_> {
        ValueRef::Leaf(self)
    }

    fn env_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Leaf(self)
    }
}

impl<T: 'static> EnvValue for Vec<T> {
    fn env_ref(&self) -> ValueRef<'_> {
        ValueRef::Leaf(self)
    }

    fn env_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Leaf(self)
    }
}

impl<T: EnvValue + ?Sized> EnvValue for Box<T> {
    fn env_ref(&self) -> ValueRef<'_> {
        (**self).env_ref()
    }

    fn env_mut(&mut self) -> ValueMut<'_> {
        (**self).env_mut()
    }
}

macro_rules! unsupported {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl<T: 'static> EnvValue for $ty {
                fn env_ref(&self) -> ValueRef<'_> {
                    ValueRef::Unsupported
                }

                fn env_mut(&mut self) -> ValueMut<'_> {
                    ValueMut::Unsupported
                }
            }
        )+
    };
}

unsupported!(
    PhantomData<T>,
    mpsc::Sender<T>,
    mpsc::SyncSender<T>,
    mpsc::Receiver<T>,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_def_tag() {
        let def = FieldDef {
            name: "port",
            ty: "u16",
            exported: true,
            tags: &[("env", "PORT"), ("default", "80")],
            docs: "",
        };

        assert_eq!(def.tag("env"), Some("PORT"));
        assert_eq!(def.tag("default"), Some("80"));
        assert_eq!(def.tag("doc"), None);
    }

    #[test]
    fn test_leaf_values() {
        let mut port = 8080u16;
        match port.env_mut() {
            ValueMut::Leaf(any) => *any.downcast_mut::<u16>().unwrap() = 9090,
            _ => panic!("u16 must be a leaf"),
        }
        assert_eq!(port, 9090);

        let boxed: Box<Option<String>> = Box::new(None);
        match boxed.env_ref() {
            ValueRef::Leaf(any) => assert_eq!(type_of(any), TypeId::of::<Option<String>>()),
            _ => panic!("boxed option must be a leaf"),
        }
    }

    #[test]
    fn test_unsupported_values() {
        let (tx, rx) = mpsc::channel::<u8>();
        assert!(matches!(tx.env_ref(), ValueRef::Unsupported));
        assert!(matches!(rx.env_ref(), ValueRef::Unsupported));
        assert!(matches!(PhantomData::<u8>.env_ref(), ValueRef::Unsupported));
    }
}
